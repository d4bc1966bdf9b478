//! Storage interfaces consumed by the pipeline
//!
//! Two seams: [`JobStore`] for the job record and [`RecordStore`] for the customers a job
//! produces. Postgres and in-memory implementations live next to this module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rowpipe_common::types::{Job, JobError, JobStatus};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::ingest::types::CustomerRecord;

/// Partial update of a job; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub total_rows: Option<u64>,
    pub processed_rows: Option<u64>,
    pub success_count: Option<u64>,
    pub failed_count: Option<u64>,
    pub errors: Option<Vec<JobError>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Counters and errors of `job`, without touching its status
    pub fn snapshot(job: &Job) -> Self {
        Self {
            status: None,
            total_rows: Some(job.total_rows),
            processed_rows: Some(job.processed_rows),
            success_count: Some(job.success_count),
            failed_count: Some(job.failed_count),
            errors: Some(job.errors.clone()),
            completed_at: None,
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to an in-memory job
    pub fn apply(&self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(v) = self.total_rows {
            job.total_rows = v;
        }
        if let Some(v) = self.processed_rows {
            job.processed_rows = v;
        }
        if let Some(v) = self.success_count {
            job.success_count = v;
        }
        if let Some(v) = self.failed_count {
            job.failed_count = v;
        }
        if let Some(ref errors) = self.errors {
            job.errors = errors.clone();
        }
        if let Some(at) = self.completed_at {
            job.completed_at = Some(at);
        }
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &Job) -> StoreResult<()>;

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// Most recent jobs first
    async fn list_jobs(&self, limit: usize) -> StoreResult<Vec<Job>>;

    /// Fails with `StoreError::JobNotFound` when no job has this id
    async fn update_job(&self, id: Uuid, update: &JobUpdate) -> StoreResult<()>;

    /// Oldest pending job (by creation time, then id)
    async fn next_pending(&self) -> StoreResult<Option<Uuid>>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert every record whose email is not taken yet
    ///
    /// Returns the emails that were actually inserted. Conflicts are not errors.
    async fn insert_new(&self, records: &[CustomerRecord]) -> StoreResult<HashSet<String>>;
}
