//! Shared fixtures for rowpipe-server integration tests
//!
//! Most tests run the real pipeline against [`MemoryStore`] and files in a temporary upload
//! directory. [`TestPostgres`] starts a throwaway PostgreSQL container for the tests that need
//! the real store; those are `#[ignore]`d because they require Docker.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use rowpipe_server::config::PipelineConfig;
use rowpipe_server::ingest::{ByteSource, ByteStream, IngestPipeline, ProgressHub, UploadDirSource, YieldPoint};
use rowpipe_server::jobs::{ChannelQueue, JobService, MemoryStore, RecordStore, UploadMode};
use rowpipe_common::types::Job;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tempfile::TempDir;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use uuid::Uuid;

pub const HEADER: &str = "name,email,phone,company";

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rowpipe_server=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// `rows` customers with distinct valid emails, header included
pub fn customers_csv(rows: usize) -> String {
    let mut csv = String::from(HEADER);
    for i in 1..=rows {
        csv.push_str(&format!("\nCustomer {i},customer{i}@example.com,555-{i:04},Company {i}"));
    }
    csv.push('\n');
    csv
}

/// In-memory store, upload directory and job service wired together
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub hub: Arc<ProgressHub>,
    pub queue: Arc<ChannelQueue>,
    pub service: JobService,
}

impl Harness {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(ChannelQueue::new());
        let service = JobService::new(store.clone(), queue.clone(), dir.path().join("uploads"));

        Ok(Self {
            dir,
            store,
            hub: Arc::new(ProgressHub::new()),
            queue,
            service,
        })
    }

    pub fn pipeline(&self, config: PipelineConfig) -> IngestPipeline {
        self.pipeline_with_records(config, self.store.clone())
    }

    pub fn pipeline_with_records(
        &self,
        config: PipelineConfig,
        records: Arc<dyn RecordStore>,
    ) -> IngestPipeline {
        IngestPipeline::new(
            config,
            self.store.clone(),
            records,
            Arc::new(UploadDirSource::new(self.dir.path().join("uploads"))),
            self.hub.clone(),
        )
    }

    /// Pipeline over the harness store that reads from `source` instead of the upload dir
    pub fn pipeline_with_source(
        &self,
        config: PipelineConfig,
        source: Arc<dyn ByteSource>,
    ) -> IngestPipeline {
        IngestPipeline::new(
            config,
            self.store.clone(),
            self.store.clone(),
            source,
            self.hub.clone(),
        )
    }

    /// Write `contents` to a scratch file and submit it as a new job
    pub async fn submit(&self, contents: impl AsRef<[u8]>) -> Result<Job> {
        let scratch = self.dir.path().join(format!("upload-{}", Uuid::new_v4()));
        std::fs::write(&scratch, contents)?;
        Ok(self
            .service
            .submit_file(&scratch, Some("customers.csv"), UploadMode::Move)
            .await?)
    }
}

/// Byte source serving fixed buffers, without touching the filesystem
#[derive(Default)]
pub struct MemorySource {
    files: Mutex<HashMap<Uuid, Vec<u8>>>,
}

impl MemorySource {
    pub fn insert(&self, job_id: Uuid, contents: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(job_id, contents.into());
        }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn open(&self, job_id: Uuid) -> std::io::Result<ByteStream> {
        let bytes = self
            .files
            .lock()
            .ok()
            .and_then(|mut files| files.remove(&job_id))
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such upload"))?;
        Ok(Box::new(std::io::Cursor::new(bytes)))
    }
}

/// Byte source whose stream yields `contents` and then fails with an I/O error
pub struct FailingSource {
    contents: Vec<u8>,
}

impl FailingSource {
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
        }
    }
}

#[async_trait]
impl ByteSource for FailingSource {
    async fn open(&self, _job_id: Uuid) -> std::io::Result<ByteStream> {
        Ok(Box::new(FailAfter {
            contents: self.contents.clone(),
            pos: 0,
        }))
    }
}

struct FailAfter {
    contents: Vec<u8>,
    pos: usize,
}

impl AsyncRead for FailAfter {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let remaining = self.contents.len() - self.pos;
        if remaining == 0 {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "upload connection reset",
            )));
        }

        let n = remaining.min(buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.contents[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

/// Counts pipeline yields
#[derive(Default)]
pub struct CountingYield {
    count: AtomicU64,
}

impl CountingYield {
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl YieldPoint for CountingYield {
    async fn yield_now(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

/// Holds the pipeline at every yield until the test releases it
pub struct GatedYield {
    arrived: mpsc::UnboundedSender<()>,
    release: tokio::sync::Mutex<mpsc::UnboundedReceiver<()>>,
}

/// Test side of a [`GatedYield`]
pub struct Gate {
    arrived: mpsc::UnboundedReceiver<()>,
    release: mpsc::UnboundedSender<()>,
}

impl GatedYield {
    pub fn new() -> (Arc<Self>, Gate) {
        let (arrived_tx, arrived_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                arrived: arrived_tx,
                release: tokio::sync::Mutex::new(release_rx),
            }),
            Gate {
                arrived: arrived_rx,
                release: release_tx,
            },
        )
    }
}

#[async_trait]
impl YieldPoint for GatedYield {
    async fn yield_now(&self) {
        let _ = self.arrived.send(());
        self.release.lock().await.recv().await;
    }
}

impl Gate {
    /// Wait until the pipeline finished a batch and is parked
    pub async fn arrived(&mut self) {
        self.arrived.recv().await;
    }

    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

/// PostgreSQL container with migrations applied
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        let container = Postgres::default().with_tag("16-alpine").start().await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let conn_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&conn_string)
            .await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;

        Ok(Self {
            _container: container,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
