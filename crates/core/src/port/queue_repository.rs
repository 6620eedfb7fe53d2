// Queue Repository Port (Interface)

use crate::domain::{CapacityAccount, ExecutionId, QueueEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for queue entries and the capacity account
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert a new entry (already stamped with id, status and created_at)
    async fn insert(&self, entry: &QueueEntry) -> Result<()>;

    /// Find entry by ID
    async fn find_by_id(&self, id: &ExecutionId) -> Result<Option<QueueEntry>>;

    /// All entries, ascending created_at then insertion order
    async fn list_entries(&self) -> Result<Vec<QueueEntry>>;

    /// Current capacity account, or the default when none exists yet
    async fn capacity(&self) -> Result<CapacityAccount>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::ExecutionStatus;
    use crate::error::AppError;
    use crate::port::{QueueTransaction, Transaction, TransactionalQueueRepository};
    use std::sync::Arc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    #[derive(Debug, Clone, Default)]
    struct State {
        entries: Vec<QueueEntry>, // insertion order
        capacity: Option<CapacityAccount>,
    }

    impl State {
        fn ordered(&self) -> Vec<QueueEntry> {
            let mut entries = self.entries.clone();
            // Stable sort keeps insertion order for equal timestamps
            entries.sort_by_key(|e| e.created_at);
            entries
        }
    }

    /// In-memory store. Transactions hold an exclusive lock for their whole
    /// lifetime, which makes them trivially serializable.
    pub struct InMemoryQueueRepository {
        state: Arc<Mutex<State>>,
    }

    impl InMemoryQueueRepository {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(State::default())),
            }
        }

        pub fn with_capacity(account: CapacityAccount) -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    entries: Vec::new(),
                    capacity: Some(account),
                })),
            }
        }

        /// Account as stored, without default synthesis
        pub async fn stored_capacity(&self) -> Option<CapacityAccount> {
            self.state.lock().await.capacity.clone()
        }
    }

    impl Default for InMemoryQueueRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl QueueRepository for InMemoryQueueRepository {
        async fn insert(&self, entry: &QueueEntry) -> Result<()> {
            let mut state = self.state.lock().await;
            if state.entries.iter().any(|e| e.id == entry.id) {
                return Err(AppError::Database(format!(
                    "Unique constraint violation: execution {}",
                    entry.id
                )));
            }
            state.entries.push(entry.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &ExecutionId) -> Result<Option<QueueEntry>> {
            let state = self.state.lock().await;
            Ok(state.entries.iter().find(|e| &e.id == id).cloned())
        }

        async fn list_entries(&self) -> Result<Vec<QueueEntry>> {
            Ok(self.state.lock().await.ordered())
        }

        async fn capacity(&self) -> Result<CapacityAccount> {
            Ok(self.state.lock().await.capacity.clone().unwrap_or_default())
        }
    }

    #[async_trait]
    impl TransactionalQueueRepository for InMemoryQueueRepository {
        async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>> {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let working = guard.clone();
            Ok(Box::new(InMemoryTransaction { guard, working }))
        }
    }

    struct InMemoryTransaction {
        guard: OwnedMutexGuard<State>,
        working: State,
    }

    #[async_trait]
    impl Transaction for InMemoryTransaction {
        async fn commit(mut self: Box<Self>) -> Result<()> {
            *self.guard = std::mem::take(&mut self.working);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl QueueTransaction for InMemoryTransaction {
        async fn capacity(&mut self) -> Result<Option<CapacityAccount>> {
            Ok(self.working.capacity.clone())
        }

        async fn oldest_waiting(&mut self) -> Result<Option<QueueEntry>> {
            Ok(self
                .working
                .ordered()
                .into_iter()
                .find(|e| e.status == ExecutionStatus::Waiting))
        }

        async fn find_entry(&mut self, id: &ExecutionId) -> Result<Option<QueueEntry>> {
            Ok(self.working.entries.iter().find(|e| &e.id == id).cloned())
        }

        async fn update_entry(
            &mut self,
            entry: &QueueEntry,
            expected: ExecutionStatus,
        ) -> Result<()> {
            let stored = self
                .working
                .entries
                .iter_mut()
                .find(|e| e.id == entry.id && e.status == expected)
                .ok_or_else(|| {
                    AppError::Conflict(format!(
                        "Execution {} is no longer {}",
                        entry.id, expected
                    ))
                })?;
            stored.status = entry.status;
            stored.started_at = entry.started_at;
            stored.finished_at = entry.finished_at;
            stored.external_build_id = entry.external_build_id.clone();
            stored.external_build_url = entry.external_build_url.clone();
            stored.external_run_id = entry.external_run_id.clone();
            Ok(())
        }

        async fn save_capacity(&mut self, account: &CapacityAccount) -> Result<()> {
            self.working.capacity = Some(account.clone());
            Ok(())
        }
    }
}
