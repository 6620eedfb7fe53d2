// SQLite Transaction Implementation
//
// Units of work run on a dedicated pooled connection opened with
// BEGIN IMMEDIATE, so the write lock is taken up front and two admission
// decisions can never interleave their read-modify-write sequences.

use crate::error::map_sqlx_error;
use crate::realtime::ChangeFeed;
use crate::row::{CapacityRow, ExecutionRow};
use async_trait::async_trait;
use runqueue_core::domain::{CapacityAccount, ExecutionId, ExecutionStatus, QueueEntry};
use runqueue_core::error::{AppError, Result};
use runqueue_core::port::{QueueTransaction, Transaction};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::debug;

pub struct SqliteQueueTransaction {
    conn: Option<PoolConnection<Sqlite>>,
    feed: Arc<ChangeFeed>,
    dirty: bool,
}

impl SqliteQueueTransaction {
    /// Acquire a connection and take the database write lock
    ///
    /// # Errors
    /// - `AppError::Conflict` if the lock is still held after the busy timeout
    pub(crate) async fn begin(pool: &SqlitePool, feed: Arc<ChangeFeed>) -> Result<Self> {
        let mut conn = pool.acquire().await.map_err(map_sqlx_error)?;
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self {
            conn: Some(conn),
            feed,
            dirty: false,
        })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
    }

    async fn finish(&mut self, statement: &'static str) -> Result<()> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))?;

        if let Err(e) = sqlx::query(statement).execute(&mut *conn).await {
            // State of the connection is unknown; closing it rolls back
            drop(conn.detach());
            return Err(map_sqlx_error(e));
        }
        Ok(())
    }
}

impl Drop for SqliteQueueTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("Transaction dropped while open, discarding its connection");
            drop(conn.detach());
        }
    }
}

#[async_trait]
impl Transaction for SqliteQueueTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.finish("COMMIT").await?;
        if self.dirty {
            self.feed.publish();
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK").await
    }
}

#[async_trait]
impl QueueTransaction for SqliteQueueTransaction {
    async fn capacity(&mut self) -> Result<Option<CapacityAccount>> {
        let row = sqlx::query_as::<_, CapacityRow>(
            "SELECT max_parallel, running_count, updated_at FROM capacity WHERE id = 1",
        )
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CapacityRow::into_account))
    }

    async fn oldest_waiting(&mut self) -> Result<Option<QueueEntry>> {
        let row = sqlx::query_as::<_, ExecutionRow>(
            r#"
            SELECT * FROM executions
            WHERE status = ?
            ORDER BY created_at ASC, seq ASC
            LIMIT 1
            "#,
        )
        .bind(ExecutionStatus::Waiting.as_str())
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_sqlx_error)?;

        row.map(ExecutionRow::into_entry).transpose()
    }

    async fn find_entry(&mut self, id: &ExecutionId) -> Result<Option<QueueEntry>> {
        let row = sqlx::query_as::<_, ExecutionRow>("SELECT * FROM executions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        row.map(ExecutionRow::into_entry).transpose()
    }

    async fn update_entry(&mut self, entry: &QueueEntry, expected: ExecutionStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = ?, started_at = ?, finished_at = ?,
                external_build_id = ?, external_build_url = ?, external_run_id = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(entry.status.as_str())
        .bind(entry.started_at)
        .bind(entry.finished_at)
        .bind(&entry.external_build_id)
        .bind(&entry.external_build_url)
        .bind(&entry.external_run_id)
        .bind(&entry.id)
        .bind(expected.as_str())
        .execute(self.conn()?)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Execution {} is no longer {}",
                entry.id, expected
            )));
        }
        self.dirty = true;
        Ok(())
    }

    async fn save_capacity(&mut self, account: &CapacityAccount) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO capacity (id, max_parallel, running_count, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                max_parallel = excluded.max_parallel,
                running_count = excluded.running_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(i64::from(account.max_parallel))
        .bind(i64::from(account.running_count))
        .bind(account.updated_at)
        .execute(self.conn()?)
        .await
        .map_err(map_sqlx_error)?;

        self.dirty = true;
        Ok(())
    }
}
