//! Single-slot ingestion worker
//!
//! Takes one job id from the queue, runs the pipeline until the job is terminal, then takes
//! the next. Shutdown is honoured between jobs; a job already running gets a grace period.

use rowpipe_common::types::Job;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::ingest::IngestPipeline;
use crate::jobs::queue::JobQueue;

pub struct IngestWorker {
    pipeline: IngestPipeline,
    queue: Arc<dyn JobQueue>,
    retry_delay: Duration,
    shutdown_timeout: Duration,
}

impl IngestWorker {
    pub fn new(pipeline: IngestPipeline, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            pipeline,
            queue,
            retry_delay: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
        }
    }

    /// Pause after a queue or pipeline error before asking for work again
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Process jobs until `shutdown` resolves or the queue closes
    ///
    /// Returns the number of jobs taken from the queue.
    pub async fn run<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut taken = 0u64;
        info!("Ingest worker started (concurrency=1, FIFO order)");

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => break,
                next = self.queue.next() => next,
            };

            let job_id = match next {
                Ok(Some(job_id)) => job_id,
                Ok(None) => {
                    info!("Job queue closed");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to take the next job");
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
            };
            taken += 1;

            let work = self.pipeline.process_job(job_id);
            tokio::pin!(work);

            let result = tokio::select! {
                result = &mut work => result,
                _ = &mut shutdown => {
                    warn!(
                        job_id = %job_id,
                        timeout_secs = self.shutdown_timeout.as_secs(),
                        "Shutdown requested, waiting for the running job"
                    );
                    match tokio::time::timeout(self.shutdown_timeout, &mut work).await {
                        Ok(result) => {
                            self.report(job_id, result);
                        }
                        Err(_) => error!(
                            job_id = %job_id,
                            "Running job did not finish in time and is left in processing"
                        ),
                    }
                    break;
                }
            };

            if !self.report(job_id, result) {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        info!(jobs = taken, "Ingest worker stopped");
        taken
    }

    fn report(&self, job_id: Uuid, result: Result<Job, PipelineError>) -> bool {
        match result {
            Ok(job) => {
                info!(
                    job_id = %job_id,
                    status = %job.status,
                    success_count = job.success_count,
                    failed_count = job.failed_count,
                    "Job finished"
                );
                true
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Job could not be processed");
                false
            }
        }
    }
}
