// Transaction port for atomic read-modify-write units of work

use crate::domain::{CapacityAccount, ExecutionId, ExecutionStatus, QueueEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Opens serializable units of work over the queue and the capacity account
#[async_trait]
pub trait TransactionalQueueRepository: Send + Sync {
    /// Begin a new transaction. Implementations must isolate it from every
    /// other open transaction (serializable), blocking or failing with
    /// `AppError::Conflict` when that cannot be guaranteed.
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>>;
}

/// Queue operations within a transaction
#[async_trait]
pub trait QueueTransaction: Transaction {
    /// Stored capacity account, None if it was never written
    async fn capacity(&mut self) -> Result<Option<CapacityAccount>>;

    /// Oldest waiting entry by created_at, ties by insertion order
    async fn oldest_waiting(&mut self) -> Result<Option<QueueEntry>>;

    /// Find entry by ID (within transaction)
    async fn find_entry(&mut self, id: &ExecutionId) -> Result<Option<QueueEntry>>;

    /// Persist status, timestamps and external identifiers of `entry`,
    /// only if its stored status is still `expected`.
    ///
    /// # Errors
    /// - `AppError::Conflict` if no row with that id has status `expected`
    async fn update_entry(&mut self, entry: &QueueEntry, expected: ExecutionStatus) -> Result<()>;

    /// Create or overwrite the capacity account
    async fn save_capacity(&mut self, account: &CapacityAccount) -> Result<()>;
}
