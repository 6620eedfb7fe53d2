// Central Error Type for the Application

use crate::domain::ExecutionId;
use crate::port::DispatchError;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A concurrent unit of work won the race; safe to retry
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Raised after the entry was already committed as running
    #[error("Dispatch failed for execution {execution_id}: {source}")]
    Dispatch {
        execution_id: ExecutionId,
        #[source]
        source: DispatchError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stage of the invocation that produced this error
    pub fn stage(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration",
            AppError::Dispatch { .. } => "dispatch",
            _ => "transaction",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by mapping into AppError::Database / AppError::Conflict
