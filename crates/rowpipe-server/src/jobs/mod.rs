//! Job lifecycle around the pipeline
//!
//! - **store**: `JobStore` / `RecordStore` interfaces and partial job updates
//! - **postgres**: sqlx-backed store
//! - **memory**: in-process store
//! - **queue**: `JobQueue` over the jobs table or a tokio channel
//! - **worker**: runs queued jobs one at a time
//! - **service**: submission, lookup and error export
//! - **export**: CSV rendering of recorded errors

pub mod export;
pub mod memory;
pub mod postgres;
pub mod queue;
pub mod service;
pub mod store;
pub mod worker;

pub use export::errors_csv;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use queue::{ChannelQueue, JobQueue, PgJobQueue};
pub use service::{JobService, UploadMode};
pub use store::{JobStore, JobUpdate, RecordStore};
pub use worker::IngestWorker;
