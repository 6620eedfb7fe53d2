//! Completion Service - the external signal that finalizes running executions
//!
//! This is the only code path that moves an execution out of `running` and
//! the only one that gives its capacity slot back. Both happen in one
//! serializable unit of work, mirroring the admission decision.

use crate::domain::{CompletionOutcome, ExecutionId, ExecutionStatus, ExternalRun, QueueEntry};
use crate::error::{AppError, Result};
use crate::port::{QueueTransaction, TimeProvider, TransactionalQueueRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Completion request (e.g. sent by the CI workflow when it ends)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub execution_id: ExecutionId,
    pub outcome: CompletionOutcome,
    #[serde(default)]
    pub external_run: ExternalRun,
}

pub struct CompletionService {
    tx_repo: Arc<dyn TransactionalQueueRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl CompletionService {
    pub fn new(
        tx_repo: Arc<dyn TransactionalQueueRepository>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            tx_repo,
            time_provider,
        }
    }

    /// Move a running execution to finished/failed and release its slot
    ///
    /// # Errors
    /// - `AppError::NotFound` if the execution does not exist
    /// - `AppError::InvalidState` if it is waiting or already terminal
    pub async fn complete_execution(&self, req: CompletionRequest) -> Result<QueueEntry> {
        let mut tx = self.tx_repo.begin_transaction().await?;

        let mut entry = load_running(&mut tx, &req.execution_id).await?;
        let now = self.time_provider.now_millis();

        entry.complete(req.outcome, now)?;
        entry.attach_external_run(&req.external_run);

        let mut account = tx.capacity().await?.unwrap_or_default();
        account.release(now);

        tx.update_entry(&entry, ExecutionStatus::Running).await?;
        tx.save_capacity(&account).await?;
        tx.commit().await?;

        info!(
            execution_id = %entry.id,
            status = %entry.status,
            running_count = account.running_count,
            "Execution completed"
        );
        Ok(entry)
    }

    /// Attach CI run identifiers to a running execution without changing its status
    pub async fn record_external_run(
        &self,
        execution_id: &ExecutionId,
        run: ExternalRun,
    ) -> Result<QueueEntry> {
        if run.is_empty() {
            return Err(AppError::Validation(
                "external run must carry at least one identifier".to_string(),
            ));
        }

        let mut tx = self.tx_repo.begin_transaction().await?;
        let mut entry = load_running(&mut tx, execution_id).await?;

        entry.attach_external_run(&run);
        tx.update_entry(&entry, ExecutionStatus::Running).await?;
        tx.commit().await?;

        info!(
            execution_id = %entry.id,
            build_id = ?entry.external_build_id,
            run_id = ?entry.external_run_id,
            "External run recorded"
        );
        Ok(entry)
    }
}

async fn load_running(
    tx: &mut Box<dyn QueueTransaction>,
    id: &ExecutionId,
) -> Result<QueueEntry> {
    let entry = tx
        .find_entry(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Execution {} not found", id)))?;

    if entry.status != ExecutionStatus::Running {
        return Err(AppError::InvalidState(format!(
            "Execution {} is {}, expected running",
            id, entry.status
        )));
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::admission::AdmissionWorker;
    use crate::port::dispatcher::mocks::MockDispatcher;
    use crate::port::queue_repository::mocks::InMemoryQueueRepository;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::QueueRepository;

    async fn admitted(repo: &Arc<InMemoryQueueRepository>) -> QueueEntry {
        let entry = QueueEntry::new_test(1000);
        repo.insert(&entry).await.unwrap();
        let worker = AdmissionWorker::new(
            repo.clone(),
            Arc::new(MockDispatcher::new_success()),
            Arc::new(ManualTimeProvider::new(2000)),
        );
        assert!(worker.run_once().await.unwrap().is_admitted());
        entry
    }

    fn service(repo: &Arc<InMemoryQueueRepository>) -> CompletionService {
        CompletionService::new(repo.clone(), Arc::new(ManualTimeProvider::new(9000)))
    }

    #[tokio::test]
    async fn test_complete_releases_capacity() {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let entry = admitted(&repo).await;
        assert_eq!(repo.capacity().await.unwrap().running_count, 1);

        let done = service(&repo)
            .complete_execution(CompletionRequest {
                execution_id: entry.id.clone(),
                outcome: CompletionOutcome::Finished,
                external_run: ExternalRun {
                    run_id: Some("42".to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(done.status, ExecutionStatus::Finished);
        assert_eq!(done.finished_at, Some(9000));
        assert_eq!(done.external_run_id.as_deref(), Some("42"));

        let account = repo.capacity().await.unwrap();
        assert_eq!(account.running_count, 0);
        assert_eq!(account.updated_at, Some(9000));
    }

    #[tokio::test]
    async fn test_complete_twice_is_rejected() {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let entry = admitted(&repo).await;
        let svc = service(&repo);

        let req = CompletionRequest {
            execution_id: entry.id.clone(),
            outcome: CompletionOutcome::Failed,
            external_run: ExternalRun::default(),
        };
        svc.complete_execution(req.clone()).await.unwrap();

        let err = svc.complete_execution(req).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        // The slot is released exactly once
        assert_eq!(repo.capacity().await.unwrap().running_count, 0);
    }

    #[tokio::test]
    async fn test_complete_waiting_entry_is_rejected() {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let entry = QueueEntry::new_test(1000);
        repo.insert(&entry).await.unwrap();

        let err = service(&repo)
            .complete_execution(CompletionRequest {
                execution_id: entry.id.clone(),
                outcome: CompletionOutcome::Finished,
                external_run: ExternalRun::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert!(repo.stored_capacity().await.is_none());
    }

    #[tokio::test]
    async fn test_complete_unknown_execution() {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let err = service(&repo)
            .complete_execution(CompletionRequest {
                execution_id: "missing".to_string(),
                outcome: CompletionOutcome::Finished,
                external_run: ExternalRun::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_external_run_keeps_status() {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let entry = admitted(&repo).await;

        let updated = service(&repo)
            .record_external_run(
                &entry.id,
                ExternalRun {
                    build_id: Some("b-7".to_string()),
                    build_url: Some("https://ci.example/b-7".to_string()),
                    run_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ExecutionStatus::Running);
        let stored = repo.find_by_id(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.external_build_id.as_deref(), Some("b-7"));
        assert_eq!(repo.capacity().await.unwrap().running_count, 1);
    }

    #[tokio::test]
    async fn test_record_external_run_requires_identifier() {
        let repo = Arc::new(InMemoryQueueRepository::new());
        let err = service(&repo)
            .record_external_run(&"x".to_string(), ExternalRun::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
