// Queue Service - client-facing use cases

pub mod enqueue;

use crate::domain::{CapacityAccount, ExecutionId, ExecutionRequest};
use crate::error::{AppError, Result};
use crate::port::{
    CapacityListener, IdProvider, QueueListener, QueueRepository, RealtimeQueue, Subscription,
    TimeProvider, TransactionalQueueRepository,
};
use std::sync::Arc;
use tracing::info;

/// Queue Service: enqueue, live views and capacity configuration
pub struct QueueService {
    repo: Arc<dyn QueueRepository>,
    tx_repo: Arc<dyn TransactionalQueueRepository>,
    realtime: Arc<dyn RealtimeQueue>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl QueueService {
    pub fn new(
        repo: Arc<dyn QueueRepository>,
        tx_repo: Arc<dyn TransactionalQueueRepository>,
        realtime: Arc<dyn RealtimeQueue>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            repo,
            tx_repo,
            realtime,
            id_provider,
            time_provider,
        }
    }

    /// Insert a new waiting execution and return its ID
    pub async fn create_execution(&self, req: ExecutionRequest) -> Result<ExecutionId> {
        enqueue::execute(
            self.repo.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
        )
        .await
    }

    pub fn subscribe_to_queue(&self, listener: QueueListener) -> Subscription {
        self.realtime.subscribe_to_queue(listener)
    }

    pub fn subscribe_to_capacity(&self, listener: CapacityListener) -> Subscription {
        self.realtime.subscribe_to_capacity(listener)
    }

    /// Set the global ceiling on running executions.
    ///
    /// Creates the account if absent. Refuses a value below the current
    /// running count.
    pub async fn set_max_parallel(&self, max_parallel: u32) -> Result<CapacityAccount> {
        let mut tx = self.tx_repo.begin_transaction().await?;

        let mut account = tx.capacity().await?.unwrap_or_default();
        let now = self.time_provider.now_millis();
        if let Err(e) = account.set_max_parallel(max_parallel, now) {
            tx.rollback().await?;
            return Err(AppError::Validation(e.to_string()));
        }

        tx.save_capacity(&account).await?;
        tx.commit().await?;

        info!(
            max_parallel = account.max_parallel,
            running_count = account.running_count,
            "Capacity updated"
        );
        Ok(account)
    }
}
