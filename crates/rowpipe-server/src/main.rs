//! rowpipe worker - main entry point

use anyhow::{Context, Result};
use rowpipe_common::logging::{init_logging, LogConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use rowpipe_server::{
    config::Config,
    db,
    ingest::{IngestPipeline, ProgressHub, UploadDirSource},
    jobs::{IngestWorker, PgJobQueue, PgStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("rowpipe-server")
        .filter_directives("rowpipe_server=debug,sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    info!("Starting rowpipe worker");

    let config = Config::load()?;
    info!(
        upload_dir = %config.worker.upload_dir.display(),
        batch_size = config.pipeline.batch_size,
        checkpoint_every = config.pipeline.checkpoint_every,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to the database")?;
    db::health_check(&pool).await?;
    db::run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let pipeline = IngestPipeline::new(
        config.pipeline.clone(),
        store.clone(),
        store.clone(),
        Arc::new(UploadDirSource::new(&config.worker.upload_dir)),
        Arc::new(ProgressHub::new()),
    );
    let queue = Arc::new(PgJobQueue::new(store, config.worker.poll_interval()));

    let worker = IngestWorker::new(pipeline, queue)
        .with_retry_delay(config.worker.poll_interval())
        .with_shutdown_timeout(Duration::from_secs(config.worker.shutdown_timeout_secs));

    worker.run(shutdown_signal()).await;

    info!("Worker shut down gracefully");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
