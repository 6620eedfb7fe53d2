// External Dispatcher Port
// Boundary call that starts the actual test run on the CI system

use crate::domain::ExecutionId;
use async_trait::async_trait;
use thiserror::Error;

/// Dispatch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The CI API answered with a non-success status
    #[error("CI API rejected dispatch with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced a response
    #[error("Dispatch request failed: {0}")]
    Transport(String),
}

/// Dispatcher trait
///
/// Implementations must not retry; a retry policy, if any, belongs to the caller.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Trigger one external run for an admitted execution
    ///
    /// # Errors
    /// - DispatchError::Rejected on a non-2xx response
    /// - DispatchError::Transport if the request could not be completed
    async fn dispatch(&self, execution_id: &ExecutionId) -> Result<(), DispatchError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock dispatcher behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Answer with an HTTP-level rejection
        Reject { status: u16, body: String },
        /// Fail before any response
        Transport(String),
    }

    /// Mock Dispatcher recording every dispatched execution ID
    pub struct MockDispatcher {
        behavior: Arc<Mutex<MockBehavior>>,
        dispatched: Arc<Mutex<Vec<ExecutionId>>>,
    }

    impl MockDispatcher {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                dispatched: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_rejecting(status: u16, body: impl Into<String>) -> Self {
            Self::new(MockBehavior::Reject {
                status,
                body: body.into(),
            })
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        /// Every ID passed to `dispatch`, in call order (including failed calls)
        pub fn dispatched(&self) -> Vec<ExecutionId> {
            self.dispatched.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.dispatched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Dispatcher for MockDispatcher {
        async fn dispatch(&self, execution_id: &ExecutionId) -> Result<(), DispatchError> {
            self.dispatched.lock().unwrap().push(execution_id.clone());

            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Reject { status, body } => {
                    Err(DispatchError::Rejected { status, body })
                }
                MockBehavior::Transport(msg) => Err(DispatchError::Transport(msg)),
            }
        }
    }
}
