//! Batch-local duplicate detection on the email key

use rowpipe_common::types::JobError;
use std::collections::HashSet;

use crate::ingest::types::ValidRow;

pub const DUPLICATE_IN_FILE: &str = "duplicate email in file";

/// Keep the first valid row per email; later ones are rejected
///
/// Emails are compared as stored, i.e. trimmed and case-sensitive. Nothing is remembered
/// across batches; repeats spanning batches are caught by the store instead.
pub fn dedup_batch(rows: Vec<ValidRow>) -> (Vec<ValidRow>, Vec<JobError>) {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut kept = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for row in rows {
        if seen.insert(row.record.email.clone()) {
            kept.push(row);
        } else {
            rejected.push(row.reject(DUPLICATE_IN_FILE));
        }
    }

    (kept, rejected)
}
