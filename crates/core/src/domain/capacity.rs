// Capacity Account Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Ceiling used when no account has been persisted yet
pub const DEFAULT_MAX_PARALLEL: u32 = 2;

/// Shared counter bounding concurrently running executions.
///
/// Invariant: `running_count <= max_parallel` after every committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityAccount {
    pub max_parallel: u32,
    pub running_count: u32,
    pub updated_at: Option<i64>, // epoch ms, None until first write
}

impl Default for CapacityAccount {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            running_count: 0,
            updated_at: None,
        }
    }
}

impl CapacityAccount {
    pub fn has_capacity(&self) -> bool {
        self.running_count < self.max_parallel
    }

    pub fn available(&self) -> u32 {
        self.max_parallel.saturating_sub(self.running_count)
    }

    /// Take one slot for an admitted execution
    pub fn admit(&mut self, now_millis: i64) -> Result<()> {
        if !self.has_capacity() {
            return Err(DomainError::CapacityExhausted {
                running_count: self.running_count,
                max_parallel: self.max_parallel,
            });
        }
        self.running_count += 1;
        self.updated_at = Some(now_millis);
        Ok(())
    }

    /// Give a slot back after an execution reached a terminal state
    pub fn release(&mut self, now_millis: i64) {
        self.running_count = self.running_count.saturating_sub(1);
        self.updated_at = Some(now_millis);
    }

    pub fn set_max_parallel(&mut self, max_parallel: u32, now_millis: i64) -> Result<()> {
        if max_parallel < self.running_count {
            return Err(DomainError::MaxParallelBelowRunning {
                requested: max_parallel,
                running_count: self.running_count,
            });
        }
        self.max_parallel = max_parallel;
        self.updated_at = Some(now_millis);
        Ok(())
    }
}
