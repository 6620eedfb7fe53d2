// GitHub workflow_dispatch implementation of the Dispatcher port

use crate::GithubDispatchConfig;
use async_trait::async_trait;
use runqueue_core::domain::ExecutionId;
use runqueue_core::port::{DispatchError, Dispatcher};
use serde::Serialize;
use tracing::{info, warn};

const USER_AGENT: &str = concat!("runqueue/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: DispatchInputs<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DispatchInputs<'a> {
    execution_id: &'a str,
}

/// Starts one workflow run per admitted execution. Never retries.
pub struct GithubWorkflowDispatcher {
    client: reqwest::Client,
    config: GithubDispatchConfig,
}

impl GithubWorkflowDispatcher {
    pub fn new(config: GithubDispatchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &GithubDispatchConfig {
        &self.config
    }
}

#[async_trait]
impl Dispatcher for GithubWorkflowDispatcher {
    async fn dispatch(&self, execution_id: &ExecutionId) -> Result<(), DispatchError> {
        let body = DispatchBody {
            git_ref: &self.config.git_ref,
            inputs: DispatchInputs { execution_id },
        };

        let response = self
            .client
            .post(self.config.dispatch_url())
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                execution_id = %execution_id,
                status = status.as_u16(),
                "Workflow dispatch rejected"
            );
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        info!(
            execution_id = %execution_id,
            repository = %self.config.repository,
            workflow = %self.config.workflow_file,
            "Workflow dispatched"
        );
        Ok(())
    }
}
