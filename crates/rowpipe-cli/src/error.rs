//! Error types for the rowpipe CLI
//!
//! Messages are user-facing: each one says what went wrong and what to try next.

use rowpipe_server::db::DbError;
use rowpipe_server::{PipelineError, ServiceError, StoreError};
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Input file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// No job with this id
    #[error("Job '{0}' not found. Run 'rowpipe list' to see recent jobs.")]
    JobNotFound(Uuid),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or .env file.")]
    Config(#[from] rowpipe_common::CommonError),

    /// Pool creation, migrations or health check failed
    #[error("Database error: {0}. Check DATABASE_URL and that PostgreSQL is running.")]
    Database(#[from] DbError),

    /// Reading a job record failed
    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    /// Job submission failed
    #[error("Job service error: {0}")]
    Service(#[from] ServiceError),

    /// The pipeline could not process the job
    #[error("Import failed: {0}")]
    Pipeline(#[from] PipelineError),

    /// Background import task panicked or was cancelled
    #[error("Import task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON rendering failed
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn file_not_found(path: &std::path::Path) -> Self {
        Self::FileNotFound(path.display().to_string())
    }
}
