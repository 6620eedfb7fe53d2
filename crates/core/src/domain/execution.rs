// Queue Entry Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Execution ID (UUID v4, opaque to the scheduler)
pub type ExecutionId = String;

/// Execution status. Transitions are monotonic: waiting -> running -> finished | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Waiting,
    Running,
    Finished,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Waiting => "waiting",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Finished => "finished",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Finished | ExecutionStatus::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Ok(ExecutionStatus::Waiting),
            "running" => Ok(ExecutionStatus::Running),
            "finished" => Ok(ExecutionStatus::Finished),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Terminal outcome reported by the completion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionOutcome {
    Finished,
    Failed,
}

impl From<CompletionOutcome> for ExecutionStatus {
    fn from(outcome: CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Finished => ExecutionStatus::Finished,
            CompletionOutcome::Failed => ExecutionStatus::Failed,
        }
    }
}

impl FromStr for CompletionOutcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match ExecutionStatus::from_str(s)? {
            ExecutionStatus::Finished => Ok(CompletionOutcome::Finished),
            ExecutionStatus::Failed => Ok(CompletionOutcome::Failed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Identity of the enqueuing actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub uid: String,
    pub display_name: String,
    pub email: String,
}

/// Identifiers of the run started on the CI system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRun {
    pub build_id: Option<String>,
    pub build_url: Option<String>,
    pub run_id: Option<String>,
}

impl ExternalRun {
    pub fn is_empty(&self) -> bool {
        self.build_id.is_none() && self.build_url.is_none() && self.run_id.is_none()
    }
}

/// Creation payload sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub test_type: String,
    pub environment: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    pub requested_by: Requester,
}

/// One requested, trackable test-execution job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: ExecutionId,
    pub status: ExecutionStatus,

    // Descriptive fields, never interpreted by the scheduler
    pub test_type: String,
    pub environment: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub requested_by: Requester,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    pub external_build_id: Option<String>,
    pub external_build_url: Option<String>,
    pub external_run_id: Option<String>,
}

impl QueueEntry {
    /// Create a waiting entry
    ///
    /// # Arguments
    ///
    /// * `id` - Unique execution ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `request` - Client payload
    pub fn new(id: impl Into<String>, created_at: i64, request: ExecutionRequest) -> Self {
        Self {
            id: id.into(),
            status: ExecutionStatus::Waiting,
            test_type: request.test_type,
            environment: request.environment,
            project_id: request.project_id,
            project_name: request.project_name,
            requested_by: request.requested_by,
            created_at,
            started_at: None,
            finished_at: None,
            external_build_id: None,
            external_build_url: None,
            external_run_id: None,
        }
    }

    /// Transition to Running with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        if self.status != ExecutionStatus::Waiting {
            return Err(self.invalid_transition(ExecutionStatus::Running));
        }
        self.status = ExecutionStatus::Running;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// Transition Running -> Finished | Failed with explicit timestamp
    pub fn complete(&mut self, outcome: CompletionOutcome, now_millis: i64) -> Result<()> {
        let target = ExecutionStatus::from(outcome);
        if self.status != ExecutionStatus::Running {
            return Err(self.invalid_transition(target));
        }
        self.status = target;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Merge known external identifiers; absent fields keep their current value
    pub fn attach_external_run(&mut self, run: &ExternalRun) {
        if let Some(build_id) = &run.build_id {
            self.external_build_id = Some(build_id.clone());
        }
        if let Some(build_url) = &run.build_url {
            self.external_build_url = Some(build_url.clone());
        }
        if let Some(run_id) = &run.run_id {
            self.external_run_id = Some(run_id.clone());
        }
    }

    fn invalid_transition(&self, to: ExecutionStatus) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

impl QueueEntry {
    /// Create a test entry with a deterministic ID (test-1, test-2, ...)
    ///
    /// **Note**: tests only. Production code injects ID and time via providers.
    pub fn new_test(created_at: i64) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self::new(
            format!("test-{}", counter),
            created_at,
            ExecutionRequest::sample(),
        )
    }
}

impl ExecutionRequest {
    /// Minimal valid payload (tests and examples)
    pub fn sample() -> Self {
        Self {
            test_type: "e2e".to_string(),
            environment: "staging".to_string(),
            project_id: None,
            project_name: None,
            requested_by: Requester {
                uid: "u-1".to_string(),
                display_name: "Test User".to_string(),
                email: "test@example.com".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_waiting() {
        let entry = QueueEntry::new("e-1", 1000, ExecutionRequest::sample());
        assert_eq!(entry.status, ExecutionStatus::Waiting);
        assert_eq!(entry.created_at, 1000);
        assert!(entry.started_at.is_none());
        assert!(entry.external_run_id.is_none());
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        let mut entry = QueueEntry::new_test(1000);
        entry.start(2000).unwrap();
        assert_eq!(entry.status, ExecutionStatus::Running);
        assert_eq!(entry.started_at, Some(2000));

        // Cannot start twice
        assert!(entry.start(2500).is_err());

        entry.complete(CompletionOutcome::Failed, 3000).unwrap();
        assert_eq!(entry.status, ExecutionStatus::Failed);
        assert_eq!(entry.finished_at, Some(3000));

        // Terminal states never regress
        assert!(entry.start(4000).is_err());
        assert!(entry.complete(CompletionOutcome::Finished, 4000).is_err());
    }

    #[test]
    fn test_complete_requires_running() {
        let mut entry = QueueEntry::new_test(1000);
        let err = entry
            .complete(CompletionOutcome::Finished, 2000)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidStateTransition {
                from: "waiting".to_string(),
                to: "finished".to_string(),
            }
        );
    }

    #[test]
    fn test_attach_external_run_merges() {
        let mut entry = QueueEntry::new_test(1000);
        entry.attach_external_run(&ExternalRun {
            build_id: Some("b-1".to_string()),
            ..Default::default()
        });
        entry.attach_external_run(&ExternalRun {
            run_id: Some("r-9".to_string()),
            ..Default::default()
        });
        assert_eq!(entry.external_build_id.as_deref(), Some("b-1"));
        assert_eq!(entry.external_run_id.as_deref(), Some("r-9"));
        assert!(entry.external_build_url.is_none());
    }

    #[test]
    fn test_status_parsing_is_lenient_on_case() {
        assert_eq!(
            "RUNNING".parse::<ExecutionStatus>().unwrap(),
            ExecutionStatus::Running
        );
        assert!("queued".parse::<ExecutionStatus>().is_err());
        assert!("waiting".parse::<CompletionOutcome>().is_err());
    }

    #[test]
    fn test_request_payload_is_camel_case() {
        let json = serde_json::json!({
            "testType": "smoke",
            "environment": "prod",
            "projectId": null,
            "requestedBy": {"uid": "u", "displayName": "U", "email": "u@x.io"}
        });
        let req: ExecutionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.test_type, "smoke");
        assert!(req.project_name.is_none());
        assert_eq!(req.requested_by.display_name, "U");
    }
}
