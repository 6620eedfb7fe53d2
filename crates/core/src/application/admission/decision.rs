// Admission Decision - one serializable read-modify-write unit of work

use super::AdmissionOutcome;
use crate::domain::ExecutionStatus;
use crate::error::Result;
use crate::port::{TimeProvider, TransactionalQueueRepository};
use tracing::{debug, info};

/// Execute one admission decision
///
/// Reads the capacity account (default if absent) and the oldest waiting
/// entry. Either commits `waiting -> running` together with the capacity
/// increment, or rolls back without touching anything.
pub async fn execute(
    tx_repo: &dyn TransactionalQueueRepository,
    time_provider: &dyn TimeProvider,
) -> Result<AdmissionOutcome> {
    let mut tx = tx_repo.begin_transaction().await?;

    let mut account = tx.capacity().await?.unwrap_or_default();
    if !account.has_capacity() {
        tx.rollback().await?;
        debug!(
            running_count = account.running_count,
            max_parallel = account.max_parallel,
            "No capacity available"
        );
        return Ok(AdmissionOutcome::NoCapacity(account));
    }

    let mut entry = match tx.oldest_waiting().await? {
        Some(entry) => entry,
        None => {
            tx.rollback().await?;
            debug!("Queue empty");
            return Ok(AdmissionOutcome::EmptyQueue);
        }
    };

    let now = time_provider.now_millis();
    entry.start(now)?;
    account.admit(now)?;

    // Both writes land in the same unit of work
    tx.update_entry(&entry, ExecutionStatus::Waiting).await?;
    tx.save_capacity(&account).await?;
    tx.commit().await?;

    info!(
        execution_id = %entry.id,
        running_count = account.running_count,
        max_parallel = account.max_parallel,
        "Execution admitted"
    );

    Ok(AdmissionOutcome::Admitted(entry))
}
