// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid execution state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown execution status: {0}")]
    UnknownStatus(String),

    #[error("Capacity exhausted: {running_count}/{max_parallel} running")]
    CapacityExhausted { running_count: u32, max_parallel: u32 },

    #[error("max_parallel {requested} is below current running count {running_count}")]
    MaxParallelBelowRunning { requested: u32, running_count: u32 },
}

pub type Result<T> = std::result::Result<T, DomainError>;
