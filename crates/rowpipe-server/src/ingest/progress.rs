//! Job counters, status transitions and durable checkpoints
//!
//! The tracker owns the working copy of the job while it runs. Counters are updated in memory
//! after every batch and written to the [`JobStore`] every `checkpoint_every` batches and at the
//! end. Every change is offered to the job's [`ProgressBroadcaster`].

use chrono::Utc;
use rowpipe_common::types::{Job, JobError, JobStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::ingest::broadcast::ProgressBroadcaster;
use crate::ingest::types::BatchOutcome;
use crate::jobs::store::{JobStore, JobUpdate};

pub struct ProgressTracker {
    job: Job,
    jobs: Arc<dyn JobStore>,
    broadcaster: ProgressBroadcaster,
    batches: u64,
    checkpoint_every: u64,
    max_recorded_errors: Option<usize>,
    dropped_errors: u64,
}

impl ProgressTracker {
    pub fn new(
        job: Job,
        jobs: Arc<dyn JobStore>,
        broadcaster: ProgressBroadcaster,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            job,
            jobs,
            broadcaster,
            batches: 0,
            checkpoint_every: config.checkpoint_every.max(1),
            max_recorded_errors: config.max_recorded_errors,
            dropped_errors: 0,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// `pending -> processing`, persisted before any row is read
    pub async fn start(&mut self) -> Result<(), PipelineError> {
        self.transition(JobStatus::Processing)?;

        self.jobs
            .update_job(self.job.id, &JobUpdate::status(JobStatus::Processing))
            .await?;

        self.job.status = JobStatus::Processing;
        self.broadcaster.publish(self.job.progress());
        info!(job_id = %self.job.id, filename = %self.job.filename, "Job started");
        Ok(())
    }

    /// Fold one batch into the counters; checkpoints when due
    pub async fn record_batch(&mut self, outcome: BatchOutcome) {
        let job = &mut self.job;
        job.processed_rows += outcome.rows;
        job.success_count += outcome.success_count;
        job.failed_count += outcome.failed_count;
        job.total_rows = job.processed_rows;

        for error in outcome.errors {
            match self.max_recorded_errors {
                Some(cap) if job.errors.len() >= cap => self.dropped_errors += 1,
                _ => job.errors.push(error),
            }
        }

        self.batches += 1;
        debug!(
            job_id = %job.id,
            batch = self.batches,
            processed_rows = job.processed_rows,
            success_count = job.success_count,
            failed_count = job.failed_count,
            "Batch recorded"
        );

        if self.batches % self.checkpoint_every == 0 {
            self.checkpoint().await;
        }

        self.broadcaster.publish(self.job.progress());
    }

    /// Durable write of counters and errors; a failed write is logged and processing continues
    async fn checkpoint(&self) {
        match self
            .jobs
            .update_job(self.job.id, &JobUpdate::snapshot(&self.job))
            .await
        {
            Ok(()) => debug!(
                job_id = %self.job.id,
                batch = self.batches,
                processed_rows = self.job.processed_rows,
                "Checkpoint written"
            ),
            Err(e) => warn!(
                job_id = %self.job.id,
                batch = self.batches,
                error = %e,
                "Checkpoint failed, continuing"
            ),
        }
    }

    /// `processing -> completed` with the final counters
    pub async fn complete(mut self) -> Result<Job, PipelineError> {
        self.transition(JobStatus::Completed)?;

        let now = Utc::now();
        let update = JobUpdate::snapshot(&self.job)
            .with_status(JobStatus::Completed)
            .with_completed_at(now);
        self.jobs.update_job(self.job.id, &update).await?;

        update.apply(&mut self.job);
        self.report_dropped();
        self.broadcaster.publish(self.job.progress());

        info!(
            job_id = %self.job.id,
            total_rows = self.job.total_rows,
            success_count = self.job.success_count,
            failed_count = self.job.failed_count,
            "Job completed"
        );
        Ok(self.job)
    }

    /// `processing -> failed`, recording `message` as a whole-job error
    pub async fn fail(mut self, message: impl Into<String>) -> Result<Job, PipelineError> {
        self.transition(JobStatus::Failed)?;

        let message = message.into();
        self.job.errors.push(JobError::fatal(message.clone()));

        let update = JobUpdate::snapshot(&self.job).with_status(JobStatus::Failed);
        self.jobs.update_job(self.job.id, &update).await?;

        update.apply(&mut self.job);
        self.report_dropped();
        self.broadcaster.publish(self.job.progress());

        warn!(
            job_id = %self.job.id,
            processed_rows = self.job.processed_rows,
            error = %message,
            "Job failed"
        );
        Ok(self.job)
    }

    fn transition(&self, to: JobStatus) -> Result<(), PipelineError> {
        if self.job.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(PipelineError::InvalidTransition {
                id: self.job.id,
                from: self.job.status,
                to,
            })
        }
    }

    fn report_dropped(&self) {
        if self.dropped_errors > 0 {
            warn!(
                job_id = %self.job.id,
                dropped = self.dropped_errors,
                recorded = self.job.errors.len(),
                "Row errors beyond the recording limit were counted but not stored"
            );
        }
    }
}
