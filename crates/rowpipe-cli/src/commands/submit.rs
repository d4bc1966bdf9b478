//! `rowpipe submit` command implementation
//!
//! Copies the file into the worker's upload directory and queues a pending job.

use rowpipe_server::jobs::{JobService, PgJobQueue, UploadMode};
use std::path::Path;
use tracing::info;

use super::{display_name, ensure_file};
use crate::context::Context;
use crate::error::Result;

pub async fn run(ctx: &Context, file: &Path) -> Result<()> {
    ensure_file(file)?;
    let store = ctx.connect().await?;

    let queue = PgJobQueue::new(store.clone(), ctx.config.worker.poll_interval());
    let service = JobService::new(store, std::sync::Arc::new(queue), &ctx.config.worker.upload_dir);

    let job = service
        .submit_file(file, display_name(file), UploadMode::Copy)
        .await?;
    info!(job_id = %job.id, "Submitted for the worker");

    println!("{}", job.id);
    Ok(())
}
