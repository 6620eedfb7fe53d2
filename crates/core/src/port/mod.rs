// Port Layer - Interfaces for external dependencies

pub mod dispatcher;
pub mod id_provider; // For deterministic testing
pub mod queue_repository;
pub mod realtime;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use dispatcher::{DispatchError, Dispatcher};
pub use id_provider::IdProvider;
pub use queue_repository::QueueRepository;
pub use realtime::{CapacityListener, QueueListener, RealtimeQueue, Subscription};
pub use time_provider::TimeProvider;
pub use transaction::{QueueTransaction, Transaction, TransactionalQueueRepository};
