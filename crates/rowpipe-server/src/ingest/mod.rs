//! Streaming CSV ingestion
//!
//! # Architecture
//!
//! - **decoder**: byte stream to numbered rows (`csv-async`)
//! - **flow**: backpressure state machine holding at most one batch
//! - **validation**: header check and per-row rules
//! - **dedup**: batch-local duplicate emails
//! - **persistence**: bulk conditional insert and conflict reconciliation
//! - **progress**: counters, status transitions, checkpoints
//! - **broadcast**: throttled progress snapshots for live observers
//! - **schedule**: cooperative yield point between batches
//! - **source**: where a job's bytes are read from
//! - **pipeline**: the per-job loop tying the above together

pub mod broadcast;
pub mod decoder;
pub mod dedup;
pub mod flow;
pub mod persistence;
pub mod pipeline;
pub mod progress;
pub mod schedule;
pub mod source;
pub mod types;
pub mod validation;

pub use broadcast::{ProgressBroadcaster, ProgressHub, Subscription};
pub use flow::{FlowController, FlowState};
pub use pipeline::{IngestPipeline, OpenJob};
pub use schedule::{TokioYield, YieldPoint};
pub use source::{ByteSource, ByteStream, UploadDirSource};
pub use types::{CustomerRecord, DecodedRow, REQUIRED_HEADERS};
