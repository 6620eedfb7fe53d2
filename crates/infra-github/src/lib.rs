// Runqueue Infrastructure - GitHub Adapter
// Implements: Dispatcher (workflow_dispatch REST endpoint)

mod config;
mod dispatcher;

pub use config::{GithubDispatchConfig, DEFAULT_API_BASE, DEFAULT_REF, DEFAULT_WORKFLOW_FILE};
pub use dispatcher::GithubWorkflowDispatcher;
