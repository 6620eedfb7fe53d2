// Realtime Queue Port
// Live fan-out of queue and capacity snapshots to any number of subscribers

use crate::domain::{CapacityAccount, QueueEntry};
use crate::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

/// Receives the full ordered queue on every change
pub type QueueListener = Box<dyn Fn(Vec<QueueEntry>) + Send + Sync + 'static>;

/// Receives the current capacity account on every change
pub type CapacityListener = Box<dyn Fn(CapacityAccount) + Send + Sync + 'static>;

/// Push-based view over the queue. Read-only: never mutates shared state.
///
/// Every subscription receives the current snapshot once on registration,
/// then again whenever a committed change makes it differ from the last
/// delivered one. Must be called from within a Tokio runtime.
pub trait RealtimeQueue: Send + Sync {
    fn subscribe_to_queue(&self, listener: QueueListener) -> Subscription;

    fn subscribe_to_capacity(&self, listener: CapacityListener) -> Subscription;
}

/// Handle to one live subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancel: ShutdownSender,
}

impl Subscription {
    /// Create a handle and the token the delivering task watches
    pub fn new() -> (Self, ShutdownToken) {
        let (cancel, token) = shutdown_channel();
        (Self { cancel }, token)
    }

    /// Stop delivery to this subscriber only
    pub fn unsubscribe(self) {
        // Drop signals cancellation
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.shutdown();
    }
}
