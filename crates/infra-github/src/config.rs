//! Dispatcher configuration.

use runqueue_core::error::{AppError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_REF: &str = "main";
pub const DEFAULT_WORKFLOW_FILE: &str = "run-tests.yml";

/// Where and how to trigger the test workflow.
#[derive(Clone)]
pub struct GithubDispatchConfig {
    pub token: String,
    /// `owner/name`
    pub repository: String,
    pub git_ref: String,
    pub workflow_file: String,
    pub api_base: String,
}

impl GithubDispatchConfig {
    /// Validate raw settings. Token and repository are required; blank
    /// optional values fall back to their defaults.
    ///
    /// # Errors
    /// - `AppError::Config` if the token or repository is missing or blank
    pub fn new(
        token: Option<String>,
        repository: Option<String>,
        git_ref: Option<String>,
        workflow_file: Option<String>,
    ) -> Result<Self> {
        let token = required("CI token", token)?;
        let repository = required("CI repository", repository)?;

        if !repository.contains('/') {
            return Err(AppError::Config(format!(
                "CI repository must be 'owner/name', got '{}'",
                repository
            )));
        }

        Ok(Self {
            token,
            repository,
            git_ref: optional(git_ref).unwrap_or_else(|| DEFAULT_REF.to_string()),
            workflow_file: optional(workflow_file)
                .unwrap_or_else(|| DEFAULT_WORKFLOW_FILE.to_string()),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point at another API host (GitHub Enterprise, test servers)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn dispatch_url(&self) -> String {
        format!(
            "{}/repos/{}/actions/workflows/{}/dispatches",
            self.api_base, self.repository, self.workflow_file
        )
    }
}

// The token never reaches logs
impl std::fmt::Debug for GithubDispatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubDispatchConfig")
            .field("token", &"<redacted>")
            .field("repository", &self.repository)
            .field("git_ref", &self.git_ref)
            .field("workflow_file", &self.workflow_file)
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    optional(value).ok_or_else(|| AppError::Config(format!("{} is not configured", name)))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
