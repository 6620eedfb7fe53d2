// Realtime queue over SQLite
//
// Each subscription is a task that re-reads its snapshot whenever the
// change feed moves (writes made through this process) or the poll
// interval elapses (writes made by other processes sharing the file),
// and delivers it only when it differs from the last delivered one.
// A panicking listener loses that snapshot but keeps its subscription.

use crate::SqliteQueueRepository;
use runqueue_core::application::{execute_guarded, PanicGuardResult};
use runqueue_core::error::Result;
use runqueue_core::port::{
    CapacityListener, QueueListener, QueueRepository, RealtimeQueue, Subscription,
};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Fallback re-read interval for changes committed by other processes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Monotonic counter of committed writes
#[derive(Debug)]
pub struct ChangeFeed {
    tx: watch::Sender<u64>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    pub fn publish(&self) {
        self.tx.send_modify(|version| *version = version.wrapping_add(1));
    }

    pub fn version(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SqliteRealtimeQueue {
    repo: Arc<SqliteQueueRepository>,
    feed: Arc<ChangeFeed>,
    poll_interval: Duration,
}

impl SqliteRealtimeQueue {
    pub fn new(repo: Arc<SqliteQueueRepository>) -> Self {
        let feed = repo.change_feed();
        Self {
            repo,
            feed,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn spawn_subscription<T, F, Fut>(
        &self,
        kind: &'static str,
        load: F,
        deliver: Box<dyn Fn(T) + Send + Sync>,
    ) -> Subscription
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send,
    {
        let (subscription, mut cancel) = Subscription::new();
        let feed = Arc::clone(&self.feed);
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut changes = feed.subscribe();
            let mut last: Option<T> = None;

            loop {
                // Mark the current version seen before reading, so a commit
                // racing with the read triggers another pass
                changes.borrow_and_update();

                match load().await {
                    Ok(snapshot) => {
                        if cancel.is_shutdown() {
                            break;
                        }
                        if last.as_ref() != Some(&snapshot) {
                            let delivered = snapshot.clone();
                            if let PanicGuardResult::Panicked(msg) =
                                execute_guarded(AssertUnwindSafe(|| deliver(delivered)))
                            {
                                warn!(subscription = kind, panic_msg = %msg, "Listener panicked, snapshot dropped");
                            }
                            last = Some(snapshot);
                        }
                    }
                    Err(e) => {
                        warn!(subscription = kind, error = %e, "Failed to read snapshot, will retry");
                    }
                }

                tokio::select! {
                    _ = changes.changed() => {}
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = cancel.wait() => break,
                }
            }

            debug!(subscription = kind, "Subscription closed");
        });

        subscription
    }
}

impl RealtimeQueue for SqliteRealtimeQueue {
    fn subscribe_to_queue(&self, listener: QueueListener) -> Subscription {
        let repo = Arc::clone(&self.repo);
        self.spawn_subscription(
            "queue",
            move || {
                let repo = Arc::clone(&repo);
                async move { repo.list_entries().await }
            },
            listener,
        )
    }

    fn subscribe_to_capacity(&self, listener: CapacityListener) -> Subscription {
        let repo = Arc::clone(&self.repo);
        self.spawn_subscription(
            "capacity",
            move || {
                let repo = Arc::clone(&repo);
                async move { repo.capacity().await }
            },
            listener,
        )
    }
}
