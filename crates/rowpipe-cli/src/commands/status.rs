//! `rowpipe status` command implementation
//!
//! With `--follow` the job row is polled until it reaches a terminal state. Jobs run by the
//! `rowpipe-server` worker publish live progress only inside that process; the checkpointed
//! counters in the database are what another process can watch.

use indicatif::ProgressBar;
use rowpipe_common::types::Job;
use rowpipe_server::jobs::JobStore;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::context::Context;
use crate::error::{CliError, Result};
use crate::output::job_details;
use crate::progress;

pub async fn run(ctx: &Context, job_id: Uuid, json: bool, follow: bool) -> Result<()> {
    let store = ctx.connect().await?;

    let job = if follow {
        let pb = progress::create_import_progress(&job_id.to_string());
        let interval = ctx.config.worker.poll_interval();
        watch_job(store.as_ref(), job_id, interval, &pb).await?
    } else {
        store
            .find_job(job_id)
            .await?
            .ok_or(CliError::JobNotFound(job_id))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        print!("{}", job_details(&job));
    }
    Ok(())
}

/// Re-read the job every `interval` until it is completed or failed
pub async fn watch_job(
    store: &dyn JobStore,
    job_id: Uuid,
    interval: Duration,
    pb: &ProgressBar,
) -> Result<Job> {
    loop {
        let job = store
            .find_job(job_id)
            .await?
            .ok_or(CliError::JobNotFound(job_id))?;
        let event = job.progress();
        progress::render(pb, &event);

        if event.is_terminal() {
            progress::finish(pb, &event);
            return Ok(job);
        }

        debug!(job_id = %job_id, status = %job.status, "Waiting for job");
        tokio::time::sleep(interval).await;
    }
}
