//! Domain types shared between the ingestion engine and its observers
//!
//! The JSON shape of these types is the read surface of a job: field names are
//! camelCase and the error snapshot is omitted when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::CommonError;

/// Raw row snapshot keyed by header name
pub type RowSnapshot = BTreeMap<String, String>;

// ============================================================================
// Job Status
// ============================================================================

/// Lifecycle status of an import job
///
/// Transitions are monotonic: `Pending -> Processing -> {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(CommonError::InvalidStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Job Errors
// ============================================================================

/// One failed row (or the whole job, when `row_number` is 0)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    /// 1-based position of the data row in the uploaded file, 0 for whole-job failures
    pub row_number: u64,
    pub message: String,
    /// Original row as decoded, keyed by header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<RowSnapshot>,
}

impl JobError {
    pub fn for_row(row_number: u64, message: impl Into<String>, row: RowSnapshot) -> Self {
        Self {
            row_number,
            message: message.into(),
            row: Some(row),
        }
    }

    /// Error that failed the job as a whole
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            row_number: 0,
            message: message.into(),
            row: None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.row_number == 0
    }

    /// Value of a column in the row snapshot, empty when absent
    pub fn field(&self, column: &str) -> &str {
        self.row
            .as_ref()
            .and_then(|row| row.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ============================================================================
// Job Record
// ============================================================================

/// Import job as stored and as shown to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub filename: String,
    pub status: JobStatus,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub errors: Vec<JobError>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A freshly submitted job
    pub fn pending(id: Uuid, filename: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
            status: JobStatus::Pending,
            total_rows: 0,
            processed_rows: 0,
            success_count: 0,
            failed_count: 0,
            errors: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn progress(&self) -> ProgressEvent {
        ProgressEvent {
            job_id: self.id,
            processed_rows: self.processed_rows,
            total_rows: self.total_rows,
            success_count: self.success_count,
            failed_count: self.failed_count,
            status: self.status,
        }
    }
}

// ============================================================================
// Progress Events
// ============================================================================

/// Counter snapshot published to live observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub processed_rows: u64,
    pub total_rows: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub status: JobStatus,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
