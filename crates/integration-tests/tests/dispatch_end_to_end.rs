//! Admission followed by a real HTTP workflow dispatch against a local fake API.

mod common;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use common::setup;
use runqueue_core::domain::ExecutionStatus;
use runqueue_core::error::AppError;
use runqueue_core::port::DispatchError;
use runqueue_infra_github::{GithubDispatchConfig, GithubWorkflowDispatcher};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct FakeApi {
    status: StatusCode,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn dispatches(
    State(api): State<FakeApi>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, &'static str) {
    api.bodies.lock().unwrap().push(body);
    let text = if api.status.is_success() { "" } else { "server on fire" };
    (api.status, text)
}

async fn start_fake_api(status: StatusCode) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/repos/acme/shop/actions/workflows/run-tests.yml/dispatches",
            post(dispatches),
        )
        .with_state(FakeApi {
            status,
            bodies: bodies.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), bodies)
}

fn github_dispatcher(api_base: &str) -> Arc<GithubWorkflowDispatcher> {
    let config = GithubDispatchConfig::new(
        Some("token".to_string()),
        Some("acme/shop".to_string()),
        None,
        None,
    )
    .unwrap()
    .with_api_base(api_base);
    Arc::new(GithubWorkflowDispatcher::new(config))
}

#[tokio::test]
async fn test_admission_dispatches_workflow_with_execution_id() {
    let (base, bodies) = start_fake_api(StatusCode::NO_CONTENT).await;
    let store = setup().await;
    let id = store.enqueue_at(1_000).await;

    let outcome = store
        .worker(github_dispatcher(&base))
        .run_once()
        .await
        .unwrap();

    assert!(outcome.is_admitted());
    assert_eq!(
        bodies.lock().unwrap().clone(),
        vec![serde_json::json!({"ref": "main", "inputs": {"executionId": id}})]
    );
    assert_eq!(store.status_of(&id).await, ExecutionStatus::Running);
}

#[tokio::test]
async fn test_http_500_leaves_entry_running() {
    let (base, bodies) = start_fake_api(StatusCode::INTERNAL_SERVER_ERROR).await;
    let store = setup().await;
    let id = store.enqueue_at(1_000).await;

    let err = store
        .worker(github_dispatcher(&base))
        .run_once()
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "dispatch");
    assert!(matches!(
        err,
        AppError::Dispatch {
            source: DispatchError::Rejected { status: 500, .. },
            ..
        }
    ));
    assert_eq!(bodies.lock().unwrap().len(), 1);
    assert_eq!(store.status_of(&id).await, ExecutionStatus::Running);
    assert_eq!(store.running_count().await, 1);
}
