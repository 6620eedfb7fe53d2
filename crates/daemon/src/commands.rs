// Subcommand handlers (DI wiring per command)

use crate::cli::{self, DispatchArgs};
use anyhow::{Context, Result};
use runqueue_core::application::{
    shutdown_channel, AdmissionOutcome, AdmissionWorker, CompletionRequest, CompletionService,
    QueueService,
};
use runqueue_core::domain::{
    CapacityAccount, CompletionOutcome, ExecutionId, ExecutionRequest, ExternalRun, QueueEntry,
};
use runqueue_core::error::{AppError, Result as CoreResult};
use runqueue_core::port::id_provider::UuidProvider;
use runqueue_core::port::time_provider::SystemTimeProvider;
use runqueue_core::port::QueueRepository;
use runqueue_infra_github::{GithubDispatchConfig, GithubWorkflowDispatcher};
use runqueue_infra_sqlite::{create_pool, run_migrations, SqliteQueueRepository, SqliteRealtimeQueue};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Tag an application error with the stage it failed in
pub fn staged(e: AppError) -> anyhow::Error {
    let stage = e.stage();
    anyhow::Error::new(e).context(format!("{} failed", stage))
}

async fn open_store(database_path: &str) -> Result<Arc<SqliteQueueRepository>> {
    info!(database = %database_path, "Opening queue database");
    let pool = create_pool(database_path).await.map_err(staged)?;
    run_migrations(&pool).await.map_err(staged)?;
    Ok(Arc::new(SqliteQueueRepository::new(pool)))
}

fn queue_service(repo: &Arc<SqliteQueueRepository>) -> QueueService {
    let realtime = Arc::new(SqliteRealtimeQueue::new(Arc::clone(repo)));
    QueueService::new(
        repo.clone(),
        repo.clone(),
        realtime,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
    )
}

fn admission_worker(
    repo: &Arc<SqliteQueueRepository>,
    config: GithubDispatchConfig,
) -> AdmissionWorker {
    AdmissionWorker::new(
        repo.clone(),
        Arc::new(GithubWorkflowDispatcher::new(config)),
        Arc::new(SystemTimeProvider),
    )
}

/// Everything a dispatching command needs, checked before the store is opened
#[derive(Debug)]
pub struct AdmissionSettings {
    pub database_path: String,
    pub dispatch: GithubDispatchConfig,
}

impl AdmissionSettings {
    pub fn resolve(database_url: Option<&str>, dispatch: DispatchArgs) -> CoreResult<Self> {
        Ok(Self {
            database_path: cli::database_path(database_url)?,
            dispatch: dispatch.into_config()?,
        })
    }
}

/// One admission invocation. A no-op outcome is a success.
pub async fn admit(database_url: Option<&str>, dispatch: DispatchArgs) -> Result<AdmissionOutcome> {
    let settings = AdmissionSettings::resolve(database_url, dispatch).map_err(staged)?;
    let repo = open_store(&settings.database_path).await?;
    let worker = admission_worker(&repo, settings.dispatch);

    worker.run_once().await.map_err(staged)
}

/// Line printed for a finished `admit`
pub fn admission_message(outcome: &AdmissionOutcome) -> String {
    match outcome {
        AdmissionOutcome::Admitted(entry) => format!("Admitted and dispatched {}", entry.id),
        other => format!("Nothing to do: {}", other),
    }
}

pub async fn serve(
    database_url: Option<&str>,
    dispatch: DispatchArgs,
    interval: Duration,
) -> Result<()> {
    let settings = AdmissionSettings::resolve(database_url, dispatch).map_err(staged)?;
    let repo = open_store(&settings.database_path).await?;
    let worker = admission_worker(&repo, settings.dispatch);
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let worker_handle = tokio::spawn(async move { worker.run(interval, shutdown_rx).await });

    info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    shutdown_tx.shutdown();
    worker_handle
        .await
        .context("admission worker panicked")?
        .map_err(staged)?;

    info!("Shutdown complete.");
    Ok(())
}

pub async fn enqueue(database_path: &str, request: ExecutionRequest) -> Result<()> {
    let repo = open_store(database_path).await?;
    let id = queue_service(&repo)
        .create_execution(request)
        .await
        .map_err(staged)?;
    println!("{}", id);
    Ok(())
}

pub async fn complete(
    database_path: &str,
    execution_id: ExecutionId,
    outcome: CompletionOutcome,
    external_run: ExternalRun,
) -> Result<()> {
    let repo = open_store(database_path).await?;
    let service = CompletionService::new(repo.clone(), Arc::new(SystemTimeProvider));

    let entry = service
        .complete_execution(CompletionRequest {
            execution_id,
            outcome,
            external_run,
        })
        .await
        .map_err(staged)?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

pub async fn attach(
    database_path: &str,
    execution_id: ExecutionId,
    external_run: ExternalRun,
) -> Result<()> {
    let repo = open_store(database_path).await?;
    let service = CompletionService::new(repo.clone(), Arc::new(SystemTimeProvider));

    let entry = service
        .record_external_run(&execution_id, external_run)
        .await
        .map_err(staged)?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

pub async fn capacity(database_path: &str, max_parallel: Option<u32>) -> Result<()> {
    let repo = open_store(database_path).await?;

    let account = match max_parallel {
        Some(n) => queue_service(&repo)
            .set_max_parallel(n)
            .await
            .map_err(staged)?,
        None => repo.capacity().await.map_err(staged)?,
    };
    println!("{}", serde_json::to_string_pretty(&account)?);
    Ok(())
}

pub async fn list(database_path: &str) -> Result<()> {
    let repo = open_store(database_path).await?;
    let entries = repo.list_entries().await.map_err(staged)?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

/// Stream snapshots until Ctrl+C. Each line is `{"queue": [...]}` or `{"capacity": {...}}`.
pub async fn watch(database_path: &str) -> Result<()> {
    let repo = open_store(database_path).await?;
    let service = queue_service(&repo);

    let queue_subscription = service.subscribe_to_queue(Box::new(|entries: Vec<QueueEntry>| {
        println!("{}", serde_json::json!({ "queue": entries }));
    }));
    let capacity_subscription = service.subscribe_to_capacity(Box::new(|account: CapacityAccount| {
        println!("{}", serde_json::json!({ "capacity": account }));
    }));

    tokio::signal::ctrl_c().await?;

    queue_subscription.unsubscribe();
    capacity_subscription.unsubscribe();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runqueue_core::domain::{ExecutionStatus, Requester};
    use std::path::Path;

    fn dispatch_args(token: Option<&str>, api_base: Option<&str>) -> DispatchArgs {
        DispatchArgs {
            ci_token: token.map(str::to_string),
            ci_repository: Some("acme/shop".to_string()),
            ci_ref: None,
            ci_workflow: None,
            ci_api_base: api_base.map(str::to_string),
        }
    }

    fn stage_of(err: &anyhow::Error) -> &'static str {
        err.downcast_ref::<AppError>()
            .map(AppError::stage)
            .unwrap_or("unknown")
    }

    fn db_url(path: &Path) -> Option<String> {
        Some(path.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_admit_missing_token_fails_before_store_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");

        let err = admit(db_url(&path).as_deref(), dispatch_args(None, None))
            .await
            .unwrap_err();

        assert_eq!(stage_of(&err), "configuration");
        assert_eq!(err.to_string(), "configuration failed");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_admit_missing_database_url_is_configuration_error() {
        let err = admit(None, dispatch_args(Some("t"), None)).await.unwrap_err();
        assert_eq!(stage_of(&err), "configuration");
    }

    #[tokio::test]
    async fn test_admit_empty_queue_is_successful_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");

        // Nothing is waiting, so the unreachable API is never called
        let outcome = admit(
            db_url(&path).as_deref(),
            dispatch_args(Some("t"), Some("http://127.0.0.1:1")),
        )
        .await
        .unwrap();

        assert_eq!(outcome, AdmissionOutcome::EmptyQueue);
        assert_eq!(admission_message(&outcome), "Nothing to do: queue empty");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_admit_dispatch_failure_is_error_and_keeps_entry_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let url = db_url(&path);

        let repo = open_store(url.as_deref().unwrap()).await.unwrap();
        let service = queue_service(&repo);
        service.set_max_parallel(1).await.unwrap();
        let id = service
            .create_execution(ExecutionRequest {
                test_type: "smoke".to_string(),
                environment: "staging".to_string(),
                project_id: None,
                project_name: None,
                requested_by: Requester {
                    uid: "u1".to_string(),
                    display_name: "Dev".to_string(),
                    email: "dev@example.com".to_string(),
                },
            })
            .await
            .unwrap();

        let err = admit(url.as_deref(), dispatch_args(Some("t"), Some("http://127.0.0.1:1")))
            .await
            .unwrap_err();

        assert_eq!(stage_of(&err), "dispatch");
        let entry = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(entry.status, ExecutionStatus::Running);
        assert_eq!(repo.capacity().await.unwrap().running_count, 1);
    }
}
