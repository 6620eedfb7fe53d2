// SQLite QueueRepository Implementation

use crate::error::map_sqlx_error;
use crate::realtime::ChangeFeed;
use crate::row::{CapacityRow, ExecutionRow};
use crate::SqliteQueueTransaction;
use async_trait::async_trait;
use runqueue_core::domain::{CapacityAccount, ExecutionId, QueueEntry};
use runqueue_core::error::Result;
use runqueue_core::port::{QueueRepository, QueueTransaction, TransactionalQueueRepository};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

pub struct SqliteQueueRepository {
    pool: SqlitePool,
    feed: Arc<ChangeFeed>,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            feed: Arc::new(ChangeFeed::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Feed bumped after every write committed through this repository
    pub fn change_feed(&self) -> Arc<ChangeFeed> {
        Arc::clone(&self.feed)
    }
}

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn insert(&self, entry: &QueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO executions (
                id, status, test_type, environment, project_id, project_name,
                requested_by_uid, requested_by_name, requested_by_email,
                created_at, started_at, finished_at,
                external_build_id, external_build_url, external_run_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.status.as_str())
        .bind(&entry.test_type)
        .bind(&entry.environment)
        .bind(&entry.project_id)
        .bind(&entry.project_name)
        .bind(&entry.requested_by.uid)
        .bind(&entry.requested_by.display_name)
        .bind(&entry.requested_by.email)
        .bind(entry.created_at)
        .bind(entry.started_at)
        .bind(entry.finished_at)
        .bind(&entry.external_build_id)
        .bind(&entry.external_build_url)
        .bind(&entry.external_run_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.feed.publish();
        Ok(())
    }

    async fn find_by_id(&self, id: &ExecutionId) -> Result<Option<QueueEntry>> {
        let row = sqlx::query_as::<_, ExecutionRow>("SELECT * FROM executions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(ExecutionRow::into_entry).transpose()
    }

    async fn list_entries(&self) -> Result<Vec<QueueEntry>> {
        let rows = sqlx::query_as::<_, ExecutionRow>(
            "SELECT * FROM executions ORDER BY created_at ASC, seq ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(ExecutionRow::into_entry).collect()
    }

    async fn capacity(&self) -> Result<CapacityAccount> {
        let row = sqlx::query_as::<_, CapacityRow>(
            "SELECT max_parallel, running_count, updated_at FROM capacity WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CapacityRow::into_account).unwrap_or_default())
    }
}

#[async_trait]
impl TransactionalQueueRepository for SqliteQueueRepository {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>> {
        let tx = SqliteQueueTransaction::begin(&self.pool, self.change_feed()).await?;
        debug!("Transaction started");
        Ok(Box::new(tx))
    }
}
