//! Per-job progress publication
//!
//! Each job gets a [`ProgressBroadcaster`] backed by a `tokio::sync::watch` channel, so the
//! publisher never blocks and a slow subscriber only ever sees the newest counters. Throttling
//! happens on the subscriber side, per subscriber.

use dashmap::DashMap;
use rowpipe_common::types::ProgressEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

/// Publishing half for one job; cheap to clone
#[derive(Debug, Clone)]
pub struct ProgressBroadcaster {
    tx: Arc<watch::Sender<ProgressEvent>>,
    throttle: Duration,
}

impl ProgressBroadcaster {
    pub fn new(initial: ProgressEvent, throttle: Duration) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            throttle,
        }
    }

    /// Offer an update to every subscriber; never blocks
    pub fn publish(&self, event: ProgressEvent) {
        self.tx.send_replace(event);
    }

    pub fn current(&self) -> ProgressEvent {
        *self.tx.borrow()
    }

    /// Current state plus a stream of later updates
    pub fn subscribe(&self) -> (ProgressEvent, Subscription) {
        let mut rx = self.tx.subscribe();
        let snapshot = *rx.borrow_and_update();

        let subscription = Subscription {
            rx,
            throttle: self.throttle,
            last_delivery: None,
            closed: snapshot.is_terminal(),
        };

        (snapshot, subscription)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving half handed to one observer
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<ProgressEvent>,
    throttle: Duration,
    last_delivery: Option<Instant>,
    closed: bool,
}

impl Subscription {
    /// Next update, or `None` once the job reached a terminal state or its publisher went away
    ///
    /// Non-terminal updates are spaced at least one throttle interval apart; anything that
    /// arrives in between is coalesced into the newest value. Terminal updates are delivered
    /// as soon as they are published.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.closed {
            return None;
        }

        if self.rx.changed().await.is_err() {
            self.closed = true;
            return None;
        }
        let mut latest = *self.rx.borrow_and_update();

        if let Some(deadline) = self.window_end() {
            while !latest.is_terminal() {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    changed = self.rx.changed() => match changed {
                        Ok(()) => latest = *self.rx.borrow_and_update(),
                        Err(_) => {
                            self.closed = true;
                            break;
                        }
                    },
                }
            }
        }

        if latest.is_terminal() {
            self.closed = true;
        }
        self.last_delivery = Some(Instant::now());

        Some(latest)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// End of the current throttle window, if one is still open
    fn window_end(&self) -> Option<Instant> {
        let deadline = self.last_delivery? + self.throttle;
        (deadline > Instant::now()).then_some(deadline)
    }
}

/// Registry of live broadcasters, keyed by job id
#[derive(Debug, Default)]
pub struct ProgressHub {
    jobs: DashMap<Uuid, ProgressBroadcaster>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a broadcaster for a job that is about to run
    pub fn open(&self, initial: ProgressEvent, throttle: Duration) -> ProgressBroadcaster {
        let broadcaster = ProgressBroadcaster::new(initial, throttle);
        self.jobs.insert(initial.job_id, broadcaster.clone());
        broadcaster
    }

    /// Subscribe to a running job; `None` when it is not running in this process
    pub fn subscribe(&self, job_id: Uuid) -> Option<(ProgressEvent, Subscription)> {
        self.jobs.get(&job_id).map(|b| b.subscribe())
    }

    pub fn remove(&self, job_id: Uuid) {
        self.jobs.remove(&job_id);
    }

    pub fn is_running(&self, job_id: Uuid) -> bool {
        self.jobs.contains_key(&job_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rowpipe_common::types::JobStatus;

    fn event(job_id: Uuid, processed: u64, status: JobStatus) -> ProgressEvent {
        ProgressEvent {
            job_id,
            processed_rows: processed,
            total_rows: processed,
            success_count: processed,
            failed_count: 0,
            status,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_update_is_immediate_then_throttled() {
        let id = Uuid::new_v4();
        let b = ProgressBroadcaster::new(event(id, 0, JobStatus::Processing), Duration::from_millis(500));
        let (snapshot, mut sub) = b.subscribe();
        assert_eq!(snapshot.processed_rows, 0);

        b.publish(event(id, 200, JobStatus::Processing));
        let start = Instant::now();
        assert_eq!(sub.next().await.unwrap().processed_rows, 200);
        assert_eq!(start.elapsed(), Duration::ZERO);

        b.publish(event(id, 400, JobStatus::Processing));
        b.publish(event(id, 600, JobStatus::Processing));
        let got = sub.next().await.unwrap();
        assert_eq!(got.processed_rows, 600);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_bypasses_throttle_and_closes() {
        let id = Uuid::new_v4();
        let b = ProgressBroadcaster::new(event(id, 0, JobStatus::Processing), Duration::from_secs(60));
        let (_, mut sub) = b.subscribe();

        b.publish(event(id, 1, JobStatus::Processing));
        sub.next().await.unwrap();

        let start = Instant::now();
        b.publish(event(id, 2, JobStatus::Processing));
        b.publish(event(id, 3, JobStatus::Completed));
        let got = sub.next().await.unwrap();
        assert_eq!(got.status, JobStatus::Completed);
        assert_eq!(got.processed_rows, 3);
        assert_eq!(start.elapsed(), Duration::ZERO);

        assert!(sub.is_closed());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscribing_to_terminal_job_yields_snapshot_only() {
        let id = Uuid::new_v4();
        let b = ProgressBroadcaster::new(event(id, 5, JobStatus::Failed), Duration::from_millis(500));
        let (snapshot, mut sub) = b.subscribe();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_publisher_closes_subscription() {
        let id = Uuid::new_v4();
        let b = ProgressBroadcaster::new(event(id, 0, JobStatus::Processing), Duration::from_millis(500));
        let (_, mut sub) = b.subscribe();
        drop(b);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn test_hub_lookup_and_removal() {
        let hub = ProgressHub::new();
        let id = Uuid::new_v4();
        let b = hub.open(event(id, 0, JobStatus::Pending), Duration::from_millis(500));

        assert!(hub.is_running(id));
        let (snapshot, _sub) = hub.subscribe(id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Pending);
        assert_eq!(b.subscriber_count(), 1);

        hub.remove(id);
        assert!(hub.subscribe(id).is_none());
    }
}
