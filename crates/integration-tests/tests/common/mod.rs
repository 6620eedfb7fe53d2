//! Shared fixtures: a file-backed store per test plus wiring helpers.

#![allow(dead_code)]

use runqueue_core::application::{AdmissionWorker, QueueService};
use runqueue_core::domain::{CapacityAccount, ExecutionId, ExecutionRequest, ExecutionStatus};
use runqueue_core::port::id_provider::UuidProvider;
use runqueue_core::port::time_provider::mocks::ManualTimeProvider;
use runqueue_core::port::{Dispatcher, QueueRepository, TransactionalQueueRepository};
use runqueue_infra_sqlite::{create_pool, run_migrations, SqliteQueueRepository, SqliteRealtimeQueue};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct TestStore {
    dir: TempDir,
    pub repo: Arc<SqliteQueueRepository>,
    pub clock: Arc<ManualTimeProvider>,
}

pub async fn setup() -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let repo = open_repo(&dir.path().join("queue.db")).await;
    TestStore {
        dir,
        repo,
        clock: Arc::new(ManualTimeProvider::new(1_000)),
    }
}

async fn open_repo(path: &Path) -> Arc<SqliteQueueRepository> {
    let pool = create_pool(path.to_str().unwrap()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteQueueRepository::new(pool))
}

impl TestStore {
    /// A second, independent handle on the same database file
    pub async fn reopen(&self) -> Arc<SqliteQueueRepository> {
        open_repo(&self.dir.path().join("queue.db")).await
    }

    pub fn worker(&self, dispatcher: Arc<dyn Dispatcher>) -> AdmissionWorker {
        AdmissionWorker::new(self.repo.clone(), dispatcher, self.clock.clone())
    }

    pub fn queue_service(&self) -> QueueService {
        let realtime = SqliteRealtimeQueue::new(self.repo.clone())
            .with_poll_interval(Duration::from_millis(50));
        QueueService::new(
            self.repo.clone(),
            self.repo.clone(),
            Arc::new(realtime),
            Arc::new(UuidProvider),
            self.clock.clone(),
        )
    }

    /// Enqueue through the service with the clock pinned to `created_at`
    pub async fn enqueue_at(&self, created_at: i64) -> ExecutionId {
        self.clock.set(created_at);
        self.queue_service()
            .create_execution(ExecutionRequest::sample())
            .await
            .unwrap()
    }

    pub async fn set_capacity(&self, max_parallel: u32, running_count: u32) {
        let mut tx = self.repo.begin_transaction().await.unwrap();
        tx.save_capacity(&CapacityAccount {
            max_parallel,
            running_count,
            updated_at: Some(1),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    pub async fn status_of(&self, id: &ExecutionId) -> ExecutionStatus {
        self.repo.find_by_id(id).await.unwrap().unwrap().status
    }

    pub async fn running_count(&self) -> u32 {
        self.repo.capacity().await.unwrap().running_count
    }

    pub async fn stored_capacity_rows(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM capacity")
            .fetch_one(self.repo.pool())
            .await
            .unwrap()
    }
}

/// Poll `condition` for up to two seconds
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met within 2s");
}
