//! Bulk persistence of validated rows and conflict reconciliation

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::ingest::types::{BatchOutcome, CustomerRecord, ValidRow};
use crate::jobs::store::RecordStore;

pub const EMAIL_TAKEN: &str = "email already exists";
pub const DATABASE_ERROR: &str = "database error";

/// Writes one batch with a single conditional insert
#[derive(Clone)]
pub struct BatchPersister {
    records: Arc<dyn RecordStore>,
}

impl BatchPersister {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Persist `rows` and account for every one of them in `outcome`
    ///
    /// Rows whose email the store already held fail with [`EMAIL_TAKEN`]. If the insert itself
    /// fails, every row fails with [`DATABASE_ERROR`]; the error is never propagated and there
    /// is no retry.
    pub async fn persist(&self, job_id: Uuid, rows: Vec<ValidRow>, outcome: &mut BatchOutcome) {
        if rows.is_empty() {
            return;
        }

        let records: Vec<CustomerRecord> = rows.iter().map(|r| r.record.clone()).collect();

        match self.records.insert_new(&records).await {
            Ok(inserted) => {
                for row in rows {
                    if inserted.contains(&row.record.email) {
                        outcome.succeed(1);
                    } else {
                        outcome.fail(row.reject(EMAIL_TAKEN));
                    }
                }
            }
            Err(e) => {
                warn!(
                    job_id = %job_id,
                    rows = rows.len(),
                    error = %e,
                    "Bulk insert failed, rejecting the whole batch"
                );
                for row in rows {
                    outcome.fail(row.reject(DATABASE_ERROR));
                }
            }
        }
    }
}
