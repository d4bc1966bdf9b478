//! rowpipe ingestion engine
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Streams uploaded customer CSV files into PostgreSQL with bounded memory, recording every
//! rejected row on the job and publishing live progress.
//!
//! # Overview
//!
//! - **Ingestion** ([`ingest`]): decoder, backpressure, validation, deduplication, bulk
//!   persistence, progress tracking and broadcasting, all driven by [`ingest::IngestPipeline`]
//! - **Jobs** ([`jobs`]): stores, queues, the single-slot worker and the submission service
//! - **Database** ([`db`]): pool construction, migrations, health check
//! - **Configuration** ([`config`]): environment-driven settings
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rowpipe_server::config::PipelineConfig;
//! use rowpipe_server::ingest::{IngestPipeline, ProgressHub, UploadDirSource};
//! use rowpipe_server::jobs::MemoryStore;
//!
//! # async fn run(job_id: uuid::Uuid) -> Result<(), rowpipe_server::error::PipelineError> {
//! let store = Arc::new(MemoryStore::new());
//! let pipeline = IngestPipeline::new(
//!     PipelineConfig::default(),
//!     store.clone(),
//!     store,
//!     Arc::new(UploadDirSource::new("./uploads")),
//!     Arc::new(ProgressHub::new()),
//! );
//! let job = pipeline.process_job(job_id).await?;
//! println!("{} rows imported", job.success_count);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod jobs;

pub use error::{PipelineError, QueueError, ServiceError, StoreError};
