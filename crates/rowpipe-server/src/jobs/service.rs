//! Job submission and lookup

use rowpipe_common::types::Job;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::jobs::export::errors_csv;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::JobStore;

/// What happens to the submitted file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Take ownership of a temporary upload
    Move,
    /// Leave the caller's file in place
    Copy,
}

#[derive(Clone)]
pub struct JobService {
    jobs: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
    upload_dir: PathBuf,
}

impl JobService {
    pub fn new(jobs: Arc<dyn JobStore>, queue: Arc<dyn JobQueue>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            jobs,
            queue,
            upload_dir: upload_dir.into(),
        }
    }

    /// Store the file as `<upload_dir>/<job-id>.csv`, create the pending job and enqueue it
    ///
    /// `original_name` becomes the job's filename; without one the stored name is used.
    pub async fn submit_file(
        &self,
        path: &Path,
        original_name: Option<&str>,
        mode: UploadMode,
    ) -> Result<Job, ServiceError> {
        let job_id = Uuid::new_v4();
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let target = self.upload_dir.join(format!("{}.csv", job_id));
        match mode {
            UploadMode::Move => {
                if let Err(e) = tokio::fs::rename(path, &target).await {
                    debug!(error = %e, "Rename failed, falling back to copy");
                    tokio::fs::copy(path, &target).await?;
                    tokio::fs::remove_file(path).await?;
                }
            }
            UploadMode::Copy => {
                tokio::fs::copy(path, &target).await?;
            }
        }

        let filename = original_name
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.csv", job_id));

        let job = Job::pending(job_id, filename);
        self.jobs.create_job(&job).await?;
        self.queue.enqueue(job_id).await?;

        info!(job_id = %job_id, filename = %job.filename, "Job submitted");
        Ok(job)
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Option<Job>, ServiceError> {
        Ok(self.jobs.find_job(id).await?)
    }

    /// Newest first
    pub async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, ServiceError> {
        Ok(self.jobs.list_jobs(limit).await?)
    }

    /// CSV of the job's recorded errors, `None` for an unknown job
    pub async fn export_errors(&self, id: Uuid) -> Result<Option<String>, ServiceError> {
        Ok(self.jobs.find_job(id).await?.map(|job| errors_csv(&job.errors)))
    }
}
