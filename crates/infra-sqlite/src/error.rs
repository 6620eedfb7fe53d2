// sqlx::Error -> AppError mapping

use runqueue_core::error::AppError;

/// Convert sqlx::Error to AppError with structured information
///
/// Lock contention surfaces as `AppError::Conflict` so callers can retry the
/// whole unit of work.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let Some(code) = db_err.code() else {
                return AppError::Database(format!("Database error: {}", db_err.message()));
            };

            // SQLite (extended) result codes: https://www.sqlite.org/rescode.html
            match code.as_ref() {
                // SQLITE_BUSY, BUSY_RECOVERY, BUSY_SNAPSHOT, BUSY_TIMEOUT
                "5" | "261" | "517" | "773" => AppError::Conflict(format!(
                    "Database busy ({}): {}",
                    code,
                    db_err.message()
                )),
                // SQLITE_LOCKED, LOCKED_SHAREDCACHE
                "6" | "262" => AppError::Conflict(format!(
                    "Database locked ({}): {}",
                    code,
                    db_err.message()
                )),
                "2067" | "1555" => AppError::Database(format!(
                    "Unique constraint violation: {} ({})",
                    db_err.message(),
                    code
                )),
                "275" => AppError::Database(format!(
                    "Check constraint violation: {} ({})",
                    db_err.message(),
                    code
                )),
                "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                other => AppError::Database(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        sqlx::Error::PoolTimedOut => {
            AppError::Conflict("Timed out waiting for a database connection".to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}
