// Row types and their coercion into domain models

use runqueue_core::domain::{CapacityAccount, ExecutionStatus, QueueEntry, Requester};
use runqueue_core::error::{AppError, Result};

/// Columns of the `executions` table (seq is only used for ordering)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExecutionRow {
    pub id: String,
    pub status: String,
    pub test_type: String,
    pub environment: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub requested_by_uid: String,
    pub requested_by_name: String,
    pub requested_by_email: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub external_build_id: Option<String>,
    pub external_build_url: Option<String>,
    pub external_run_id: Option<String>,
}

impl ExecutionRow {
    pub fn into_entry(self) -> Result<QueueEntry> {
        let status: ExecutionStatus = self.status.parse().map_err(|e| {
            AppError::Database(format!("Execution {} has corrupt status: {}", self.id, e))
        })?;

        Ok(QueueEntry {
            id: self.id,
            status,
            test_type: self.test_type,
            environment: self.environment,
            project_id: non_empty(self.project_id),
            project_name: non_empty(self.project_name),
            requested_by: Requester {
                uid: self.requested_by_uid,
                display_name: self.requested_by_name,
                email: self.requested_by_email,
            },
            created_at: self.created_at,
            started_at: timestamp(self.started_at),
            finished_at: timestamp(self.finished_at),
            external_build_id: non_empty(self.external_build_id),
            external_build_url: non_empty(self.external_build_url),
            external_run_id: non_empty(self.external_run_id),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CapacityRow {
    pub max_parallel: i64,
    pub running_count: i64,
    pub updated_at: Option<i64>,
}

impl CapacityRow {
    pub fn into_account(self) -> CapacityAccount {
        CapacityAccount {
            max_parallel: clamp_u32(self.max_parallel),
            running_count: clamp_u32(self.running_count),
            updated_at: timestamp(self.updated_at),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// Zero or negative timestamps are treated as never set
fn timestamp(value: Option<i64>) -> Option<i64> {
    value.filter(|ts| *ts > 0)
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
