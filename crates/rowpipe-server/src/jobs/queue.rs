//! Job queues feeding the worker
//!
//! A queue hands out one job id at a time in submission order. The worker takes the next id
//! only after the previous job reached a terminal state, which caps concurrency at one.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;
use uuid::Uuid;

use crate::error::{QueueError, QueueResult};
use crate::jobs::store::JobStore;

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job_id: Uuid) -> QueueResult<()>;

    /// Wait for the next job; `None` once the queue will never yield another
    async fn next(&self) -> QueueResult<Option<Uuid>>;
}

/// The `jobs` table as a queue: the oldest pending row is the next delivery
pub struct PgJobQueue {
    jobs: Arc<dyn JobStore>,
    poll_interval: Duration,
}

impl PgJobQueue {
    pub fn new(jobs: Arc<dyn JobStore>, poll_interval: Duration) -> Self {
        Self {
            jobs,
            poll_interval,
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    /// A pending job row is already queued
    async fn enqueue(&self, _job_id: Uuid) -> QueueResult<()> {
        Ok(())
    }

    async fn next(&self) -> QueueResult<Option<Uuid>> {
        loop {
            if let Some(id) = self.jobs.next_pending().await? {
                return Ok(Some(id));
            }
            trace!(poll_ms = self.poll_interval.as_millis() as u64, "No pending jobs");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// In-process FIFO over an unbounded channel
pub struct ChannelQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<Uuid>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Uuid>>,
}

impl ChannelQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }

    /// Refuse new jobs; already queued ids are still delivered
    pub async fn close(&self) {
        self.tx.lock().await.take();
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for ChannelQueue {
    async fn enqueue(&self, job_id: Uuid) -> QueueResult<()> {
        let tx = self.tx.lock().await;
        tx.as_ref()
            .ok_or(QueueError::Closed)?
            .send(job_id)
            .map_err(|_| QueueError::Closed)
    }

    async fn next(&self) -> QueueResult<Option<Uuid>> {
        Ok(self.rx.lock().await.recv().await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::jobs::memory::MemoryStore;
    use rowpipe_common::types::Job;

    #[tokio::test]
    async fn test_channel_queue_is_fifo_and_drains_after_close() {
        let queue = ChannelQueue::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        queue.enqueue(a).await.unwrap();
        queue.enqueue(b).await.unwrap();
        queue.close().await;

        assert!(matches!(queue.enqueue(Uuid::new_v4()).await, Err(QueueError::Closed)));
        assert_eq!(queue.next().await.unwrap(), Some(a));
        assert_eq!(queue.next().await.unwrap(), Some(b));
        assert_eq!(queue.next().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pg_queue_polls_until_a_job_is_pending() {
        let store = Arc::new(MemoryStore::new());
        let queue = PgJobQueue::new(store.clone(), Duration::from_millis(100));

        let job = Job::pending(Uuid::new_v4(), "late.csv");
        let id = job.id;
        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            writer.create_job(&job).await.unwrap();
        });

        assert_eq!(queue.next().await.unwrap(), Some(id));
    }
}
