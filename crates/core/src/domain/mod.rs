// Domain Layer - Pure business logic and entities

pub mod capacity;
pub mod error;
pub mod execution;

// Re-exports
pub use capacity::{CapacityAccount, DEFAULT_MAX_PARALLEL};
pub use error::DomainError;
pub use execution::{
    CompletionOutcome, ExecutionId, ExecutionRequest, ExecutionStatus, ExternalRun, QueueEntry,
    Requester,
};
