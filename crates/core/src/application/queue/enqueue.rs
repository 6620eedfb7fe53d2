// Enqueue Use Case

use crate::domain::{ExecutionId, ExecutionRequest, QueueEntry};
use crate::error::Result;
use crate::port::{IdProvider, QueueRepository, TimeProvider};
use tracing::info;

/// Execute enqueue use case
///
/// Persistence errors are propagated as-is; nothing is retried here.
///
/// # Arguments
///
/// * `repo` - Queue repository
/// * `id_provider` - ID generator (injected for determinism)
/// * `time_provider` - Clock stamping created_at (injected for determinism)
/// * `req` - Creation payload
pub async fn execute(
    repo: &dyn QueueRepository,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: ExecutionRequest,
) -> Result<ExecutionId> {
    let execution_id = id_provider.generate_id();
    let created_at = time_provider.now_millis();

    let entry = QueueEntry::new(execution_id.clone(), created_at, req);
    repo.insert(&entry).await?;

    info!(
        execution_id = %execution_id,
        test_type = %entry.test_type,
        environment = %entry.environment,
        requested_by = %entry.requested_by.uid,
        "Execution enqueued"
    );

    Ok(execution_id)
}
