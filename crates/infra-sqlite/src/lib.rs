// Runqueue Infrastructure - SQLite Adapter
// Implements: QueueRepository, TransactionalQueueRepository, RealtimeQueue

mod connection;
mod error;
mod migration;
mod queue_repository;
mod realtime;
mod row;
mod transaction;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue_repository::SqliteQueueRepository;
pub use realtime::{ChangeFeed, SqliteRealtimeQueue, DEFAULT_POLL_INTERVAL};
pub use transaction::SqliteQueueTransaction;

// Note: sqlx::Error conversion is handled by error::map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{create_pool, run_migrations, SqliteQueueRepository};
    use tempfile::TempDir;

    /// File-backed database (in-memory SQLite would share one cache across
    /// pooled connections and report SQLITE_LOCKED under contention)
    pub async fn setup_test_db() -> (TempDir, SqliteQueueRepository) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("queue.db").display());
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        (dir, SqliteQueueRepository::new(pool))
    }
}
