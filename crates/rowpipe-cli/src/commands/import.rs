//! `rowpipe import` command implementation
//!
//! Submits the file and runs the pipeline in this process instead of waiting for the worker,
//! following the job's progress broadcast until it reaches a terminal state.
//!
//! Against PostgreSQL the job is an ordinary pending row, so a worker polling the same
//! database may race for it; whichever side loses gets an invalid-transition error.

use indicatif::ProgressBar;
use rowpipe_common::types::Job;
use rowpipe_server::config::PipelineConfig;
use rowpipe_server::ingest::{IngestPipeline, ProgressHub, UploadDirSource};
use rowpipe_server::jobs::{ChannelQueue, JobService, MemoryStore, PgJobQueue, UploadMode};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{display_name, ensure_file};
use crate::context::Context;
use crate::error::Result;
use crate::output::import_summary;
use crate::progress;

pub async fn run(ctx: &Context, file: &Path, in_memory: bool) -> Result<()> {
    ensure_file(file)?;
    let pb = progress::create_import_progress(display_name(file).unwrap_or("upload"));

    let job = if in_memory {
        import_in_memory(ctx.config.pipeline.clone(), file, &pb).await?
    } else {
        import_postgres(ctx, file, &pb).await?
    };

    println!("{}", import_summary(&job));
    Ok(())
}

/// Import into a throwaway in-memory store; nothing outlives the process
pub async fn import_in_memory(config: PipelineConfig, file: &Path, pb: &ProgressBar) -> Result<Job> {
    let scratch = tempfile::tempdir()?;
    let uploads = scratch.path().join("uploads");
    let store = Arc::new(MemoryStore::new());

    let service = JobService::new(store.clone(), Arc::new(ChannelQueue::new()), &uploads);
    let pipeline = IngestPipeline::new(
        config,
        store.clone(),
        store,
        Arc::new(UploadDirSource::new(&uploads)),
        Arc::new(ProgressHub::new()),
    );

    import_file(&service, pipeline, file, pb).await
}

async fn import_postgres(ctx: &Context, file: &Path, pb: &ProgressBar) -> Result<Job> {
    let store = ctx.connect().await?;
    let upload_dir = &ctx.config.worker.upload_dir;

    let queue = PgJobQueue::new(store.clone(), ctx.config.worker.poll_interval());
    let service = JobService::new(store.clone(), Arc::new(queue), upload_dir);
    let pipeline = IngestPipeline::new(
        ctx.config.pipeline.clone(),
        store.clone(),
        store,
        Arc::new(UploadDirSource::new(upload_dir)),
        Arc::new(ProgressHub::new()),
    );

    import_file(&service, pipeline, file, pb).await
}

async fn import_file(
    service: &JobService,
    pipeline: IngestPipeline,
    file: &Path,
    pb: &ProgressBar,
) -> Result<Job> {
    let job = service
        .submit_file(file, display_name(file), UploadMode::Copy)
        .await?;
    info!(job_id = %job.id, filename = %job.filename, "Importing in process");

    // Subscribe before the run starts so no update is missed
    let open = pipeline.open_job(job.id).await?;
    let (snapshot, updates) = open.subscribe();
    let handle = tokio::spawn(async move { pipeline.run_job(open).await });

    progress::follow(pb, snapshot, updates).await;
    if !pb.is_finished() {
        pb.finish_and_clear();
    }

    Ok(handle.await??)
}
