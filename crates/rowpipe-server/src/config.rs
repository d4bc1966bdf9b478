//! Configuration management

use rowpipe_common::{CommonError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Worker Configuration Constants
// ============================================================================

/// Default directory uploads are moved into, one `<job-id>.csv` per job.
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";

/// Default interval between polls of an empty job queue.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default time the in-flight job gets to finish on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Default number of rows decoded, validated and persisted together.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Largest batch a single bulk insert can bind (six parameters per row, 65535 max).
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Default number of batches between durable progress checkpoints.
pub const DEFAULT_CHECKPOINT_EVERY: u64 = 10;

/// Default minimum gap between non-terminal progress updates to one subscriber.
pub const DEFAULT_PROGRESS_THROTTLE_MS: u64 = 500;

// ============================================================================
// Database Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/rowpipe";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Full configuration of the ingestion worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub worker: WorkerConfig,
    pub pipeline: PipelineConfig,
    pub database: DatabaseConfig,
}

/// Worker loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub upload_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub shutdown_timeout_secs: u64,
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Tunables of a single job's pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rows per batch; also the bound on rows buffered in memory
    pub batch_size: usize,
    /// Durable checkpoint after this many batches
    pub checkpoint_every: u64,
    /// Per-subscriber throttle for non-terminal progress updates
    pub progress_throttle_ms: u64,
    /// Stop recording row errors past this many; counters stay exact
    pub max_recorded_errors: Option<usize>,
}

impl PipelineConfig {
    pub fn progress_throttle(&self) -> Duration {
        Duration::from_millis(self.progress_throttle_ms)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_checkpoint_every(mut self, batches: u64) -> Self {
        self.checkpoint_every = batches;
        self
    }

    pub fn with_max_recorded_errors(mut self, cap: usize) -> Self {
        self.max_recorded_errors = Some(cap);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CommonError::config("Batch size must be greater than 0"));
        }

        if self.batch_size > MAX_BATCH_SIZE {
            return Err(CommonError::config(format!(
                "Batch size {} exceeds the maximum of {}",
                self.batch_size, MAX_BATCH_SIZE
            )));
        }

        if self.checkpoint_every == 0 {
            return Err(CommonError::config(
                "Checkpoint interval must be at least one batch",
            ));
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            progress_throttle_ms: DEFAULT_PROGRESS_THROTTLE_MS,
            max_recorded_errors: None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
            connect_timeout_secs: env_or(
                "DATABASE_CONNECT_TIMEOUT",
                DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            ),
            idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(CommonError::config("Database URL cannot be empty"));
        }

        if self.max_connections == 0 {
            return Err(CommonError::config(
                "Database max_connections must be greater than 0",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(CommonError::config(format!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from environment (and `.env`) on top of defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let max_recorded_errors = match std::env::var("ROWPIPE_MAX_RECORDED_ERRORS") {
            Ok(raw) => Some(raw.parse().map_err(|_| {
                CommonError::config(format!(
                    "ROWPIPE_MAX_RECORDED_ERRORS must be a non-negative integer, got '{}'",
                    raw
                ))
            })?),
            Err(_) => None,
        };

        let config = Config {
            worker: WorkerConfig {
                upload_dir: std::env::var("ROWPIPE_UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR)),
                poll_interval_ms: env_or("ROWPIPE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
                shutdown_timeout_secs: env_or(
                    "ROWPIPE_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            pipeline: PipelineConfig {
                batch_size: env_or("ROWPIPE_BATCH_SIZE", DEFAULT_BATCH_SIZE),
                checkpoint_every: env_or("ROWPIPE_CHECKPOINT_EVERY", DEFAULT_CHECKPOINT_EVERY),
                progress_throttle_ms: env_or(
                    "ROWPIPE_PROGRESS_THROTTLE_MS",
                    DEFAULT_PROGRESS_THROTTLE_MS,
                ),
                max_recorded_errors,
            },
            database: DatabaseConfig::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker.poll_interval_ms == 0 {
            return Err(CommonError::config("Poll interval must be greater than 0"));
        }

        self.pipeline.validate()?;
        self.database.validate()?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker: WorkerConfig {
                upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
                poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            pipeline: PipelineConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Parsed environment variable, or `default` when unset or malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring malformed configuration value");
            default
        }),
        Err(_) => default,
    }
}
