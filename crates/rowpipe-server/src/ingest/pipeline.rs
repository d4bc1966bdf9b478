//! Per-job orchestration
//!
//! One cooperative loop drives a job from bytes to a terminal state:
//!
//! 1. mark the job `processing`
//! 2. open the upload and check the header line
//! 3. decode rows into the flow controller; each full batch is validated, deduplicated,
//!    persisted and folded into the counters before the decoder is polled again
//! 4. drain what is left at end-of-stream
//! 5. mark the job `completed`, or `failed` on the first fatal error
//!
//! The task yields once after every batch so a large upload cannot starve the runtime.

use rowpipe_common::types::{Job, ProgressEvent};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{DecodeError, FlowError, PipelineError};
use crate::ingest::broadcast::{ProgressBroadcaster, ProgressHub, Subscription};
use crate::ingest::decoder::RowDecoder;
use crate::ingest::dedup::dedup_batch;
use crate::ingest::flow::FlowController;
use crate::ingest::persistence::BatchPersister;
use crate::ingest::progress::ProgressTracker;
use crate::ingest::schedule::{TokioYield, YieldPoint};
use crate::ingest::source::ByteSource;
use crate::ingest::types::{BatchOutcome, DecodedRow};
use crate::ingest::validation::{validate_headers, HeaderError, RowValidator};
use crate::jobs::store::{JobStore, RecordStore};

/// Errors that end a job as `failed`; the message becomes its whole-job error
#[derive(Error, Debug)]
enum Fatal {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// A loaded job whose broadcaster is already registered in the hub
///
/// Hand it to [`IngestPipeline::run_job`]; that call removes the hub entry again.
pub struct OpenJob {
    job: Job,
    broadcaster: ProgressBroadcaster,
}

impl OpenJob {
    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn subscribe(&self) -> (ProgressEvent, Subscription) {
        self.broadcaster.subscribe()
    }
}

#[derive(Clone)]
pub struct IngestPipeline {
    config: PipelineConfig,
    jobs: Arc<dyn JobStore>,
    validator: RowValidator,
    persister: BatchPersister,
    source: Arc<dyn ByteSource>,
    hub: Arc<ProgressHub>,
    yielder: Arc<dyn YieldPoint>,
}

impl IngestPipeline {
    pub fn new(
        config: PipelineConfig,
        jobs: Arc<dyn JobStore>,
        records: Arc<dyn RecordStore>,
        source: Arc<dyn ByteSource>,
        hub: Arc<ProgressHub>,
    ) -> Self {
        Self {
            config,
            jobs,
            validator: RowValidator::new(),
            persister: BatchPersister::new(records),
            source,
            hub,
            yielder: Arc::new(TokioYield),
        }
    }

    pub fn with_yield_point(mut self, yielder: Arc<dyn YieldPoint>) -> Self {
        self.yielder = yielder;
        self
    }

    pub fn hub(&self) -> &Arc<ProgressHub> {
        &self.hub
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one job to a terminal state and return the final record
    ///
    /// Row-level and fatal problems are recorded on the job; an `Err` here means the job
    /// could not be loaded, started or finalised.
    pub async fn process_job(&self, job_id: Uuid) -> Result<Job, PipelineError> {
        let open = self.open_job(job_id).await?;
        self.run_job(open).await
    }

    /// Load the job and register its broadcaster, without processing anything yet
    ///
    /// Subscribing through the returned [`OpenJob`] observes every update of the run.
    pub async fn open_job(&self, job_id: Uuid) -> Result<OpenJob, PipelineError> {
        let job = self
            .jobs
            .find_job(job_id)
            .await?
            .ok_or(PipelineError::JobNotFound(job_id))?;

        let broadcaster = self.hub.open(job.progress(), self.config.progress_throttle());
        Ok(OpenJob { job, broadcaster })
    }

    /// Process a job opened with [`open_job`](Self::open_job); the hub entry is removed after
    pub async fn run_job(&self, open: OpenJob) -> Result<Job, PipelineError> {
        let job_id = open.job.id;
        let result = self.run(open.job, open.broadcaster).await;
        self.hub.remove(job_id);

        result
    }

    async fn run(&self, job: Job, broadcaster: ProgressBroadcaster) -> Result<Job, PipelineError> {
        let mut tracker = ProgressTracker::new(job, self.jobs.clone(), broadcaster, &self.config);
        tracker.start().await?;

        match self.stream_rows(&mut tracker).await {
            Ok(()) => tracker.complete().await,
            Err(fatal) => tracker.fail(fatal.to_string()).await,
        }
    }

    async fn stream_rows(&self, tracker: &mut ProgressTracker) -> Result<(), Fatal> {
        let job_id = tracker.job().id;
        let mut flow = FlowController::new(self.config.batch_size);

        match self.drive(job_id, &mut flow, tracker).await {
            Ok(()) => Ok(()),
            Err(fatal) => {
                let discarded = flow.buffered();
                if !flow.state().is_terminal() {
                    flow.fail()?;
                }
                debug!(job_id = %job_id, discarded, "Row flow stopped");
                Err(fatal)
            }
        }
    }

    async fn drive(
        &self,
        job_id: Uuid,
        flow: &mut FlowController<DecodedRow>,
        tracker: &mut ProgressTracker,
    ) -> Result<(), Fatal> {
        let stream = self.source.open(job_id).await.map_err(DecodeError::from)?;
        let mut decoder = RowDecoder::open(stream).await?;
        validate_headers(decoder.headers())?;

        while let Some(row) = decoder.next_row().await? {
            if let Some(batch) = flow.push(row)? {
                self.process_batch(job_id, batch, tracker).await;
                flow.batch_done()?;
                self.yielder.yield_now().await;
            }
        }

        flow.end_of_stream()?;
        while let Some(batch) = flow.next_drain_batch()? {
            self.process_batch(job_id, batch, tracker).await;
            self.yielder.yield_now().await;
        }

        info!(job_id = %job_id, rows = decoder.rows_read(), batches = tracker.batches(), "Stream drained");
        Ok(())
    }

    async fn process_batch(
        &self,
        job_id: Uuid,
        batch: Vec<DecodedRow>,
        tracker: &mut ProgressTracker,
    ) {
        let mut outcome = BatchOutcome::new(batch.len() as u64);
        let mut valid = Vec::with_capacity(batch.len());

        for row in batch {
            match self.validator.validate(job_id, row) {
                Ok(row) => valid.push(row),
                Err(error) => outcome.fail(error),
            }
        }

        let (unique, duplicates) = dedup_batch(valid);
        for error in duplicates {
            outcome.fail(error);
        }

        self.persister.persist(job_id, unique, &mut outcome).await;
        tracker.record_batch(outcome.finish()).await;
    }
}
