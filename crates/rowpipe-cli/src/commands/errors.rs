//! `rowpipe errors` command implementation
//!
//! Writes the job's error export CSV to a file or stdout.

use rowpipe_server::jobs::{errors_csv, JobStore};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::context::Context;
use crate::error::{CliError, Result};

pub async fn run(ctx: &Context, job_id: Uuid, output: Option<&Path>) -> Result<()> {
    let store = ctx.connect().await?;
    let job = store
        .find_job(job_id)
        .await?
        .ok_or(CliError::JobNotFound(job_id))?;

    let csv = errors_csv(&job.errors);
    match output {
        Some(path) => {
            write_export(path, &csv).await?;
            info!(job_id = %job_id, path = %path.display(), "Error export written");
            eprintln!("Wrote {} error(s) to {}", job.errors.len(), path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}

async fn write_export(path: &Path, csv: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, csv).await?;
    Ok(())
}
