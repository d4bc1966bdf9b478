//! In-process store used by tests and by `rowpipe import --in-memory`

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rowpipe_common::types::{Job, JobStatus};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::ingest::types::CustomerRecord;
use crate::jobs::store::{JobStore, JobUpdate, RecordStore};

/// Jobs and customers held in concurrent maps
///
/// Customers are keyed by email, so the uniqueness rule spans every job, like the
/// `customers.email` constraint in Postgres.
#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: DashMap<Uuid, Job>,
    customers: DashMap<String, CustomerRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a customer directly, bypassing any job
    pub fn insert_customer(&self, record: CustomerRecord) {
        self.customers.insert(record.email.clone(), record);
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn customers_for_job(&self, job_id: Uuid) -> Vec<CustomerRecord> {
        let mut records: Vec<CustomerRecord> = self
            .customers
            .iter()
            .filter(|entry| entry.value().job_id == job_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.email.cmp(&b.email));
        records
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, job: &Job) -> StoreResult<()> {
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.jobs.get(&id).map(|job| job.clone()))
    }

    async fn list_jobs(&self, limit: usize) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn update_job(&self, id: Uuid, update: &JobUpdate) -> StoreResult<()> {
        let mut job = self.jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;
        update.apply(&mut job);
        Ok(())
    }

    async fn next_pending(&self) -> StoreResult<Option<Uuid>> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.value().status == JobStatus::Pending)
            .map(|entry| (entry.value().created_at, entry.value().id))
            .min()
            .map(|(_, id)| id))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_new(&self, records: &[CustomerRecord]) -> StoreResult<HashSet<String>> {
        let mut inserted = HashSet::with_capacity(records.len());

        for record in records {
            if let Entry::Vacant(slot) = self.customers.entry(record.email.clone()) {
                slot.insert(record.clone());
                inserted.insert(record.email.clone());
            }
        }

        Ok(inserted)
    }
}
