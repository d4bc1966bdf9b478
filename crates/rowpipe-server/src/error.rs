//! Error types for the ingestion engine
//!
//! Row-level problems are never errors in this sense: they become `JobError` entries on the
//! job. The types here describe failures of the machinery itself.

use thiserror::Error;
use uuid::Uuid;

use crate::ingest::flow::FlowState;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures talking to the job or record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job '{0}' not found")]
    JobNotFound(Uuid),

    #[error("Stored job is corrupt: {0}")]
    Corrupt(String),
}

/// Failures reading the uploaded byte stream
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv_async::Error),
}

/// Illegal step of the backpressure state machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid flow transition: cannot {action} while {state:?}")]
pub struct FlowError {
    pub state: FlowState,
    pub action: &'static str,
}

/// Failures that stop one job from being processed
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Job '{0}' not found")]
    JobNotFound(Uuid),

    #[error("Job '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: rowpipe_common::types::JobStatus,
        to: rowpipe_common::types::JobStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Failures of the job queue
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of job submission and lookup
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
