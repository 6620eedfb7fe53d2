// Command-line surface

use clap::{Args, Parser, Subcommand, ValueEnum};
use runqueue_core::domain::{CompletionOutcome, ExecutionRequest, ExternalRun, Requester};
use runqueue_core::error::{AppError, Result};
use runqueue_infra_github::GithubDispatchConfig;

#[derive(Debug, Parser)]
#[command(name = "runqueue")]
#[command(about = "Capacity-limited admission queue for CI test executions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// SQLite database (path or sqlite:// URL). Required.
    #[arg(long, global = true, env = "RUNQUEUE_DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Validate the store setting and expand `~`
pub fn database_path(database_url: Option<&str>) -> Result<String> {
    match database_url.map(str::trim) {
        Some(url) if !url.is_empty() => Ok(shellexpand::tilde(url).into_owned()),
        _ => Err(AppError::Config(
            "database URL is required (--database-url or RUNQUEUE_DATABASE_URL)".to_string(),
        )),
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one admission invocation and exit
    Admit {
        #[command(flatten)]
        dispatch: DispatchArgs,
    },

    /// Run admission invocations on a timer until Ctrl+C
    Serve {
        #[command(flatten)]
        dispatch: DispatchArgs,

        /// Seconds between idle invocations
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },

    /// Enqueue a new waiting execution and print its ID
    Enqueue {
        #[arg(long)]
        test_type: String,

        #[arg(long)]
        environment: String,

        #[arg(long)]
        project_id: Option<String>,

        #[arg(long)]
        project_name: Option<String>,

        /// Requester user ID
        #[arg(long)]
        uid: String,

        #[arg(long)]
        display_name: String,

        #[arg(long)]
        email: String,
    },

    /// Finish a running execution and release its capacity slot
    Complete {
        execution_id: String,

        #[arg(long, value_enum)]
        outcome: OutcomeArg,

        #[command(flatten)]
        external: ExternalRunArgs,
    },

    /// Attach CI run identifiers to a running execution
    Attach {
        execution_id: String,

        #[command(flatten)]
        external: ExternalRunArgs,
    },

    /// Show or change the capacity account
    Capacity {
        /// New ceiling on running executions
        #[arg(long)]
        max_parallel: Option<u32>,
    },

    /// List all executions in queue order
    List,

    /// Print queue and capacity snapshots as JSON lines until Ctrl+C
    Watch,
}

/// CI dispatch settings, required only by commands that dispatch
#[derive(Debug, Args)]
pub struct DispatchArgs {
    #[arg(long, env = "RUNQUEUE_CI_TOKEN", hide_env_values = true)]
    pub ci_token: Option<String>,

    /// owner/name
    #[arg(long, env = "RUNQUEUE_CI_REPOSITORY")]
    pub ci_repository: Option<String>,

    #[arg(long, env = "RUNQUEUE_CI_REF")]
    pub ci_ref: Option<String>,

    #[arg(long, env = "RUNQUEUE_CI_WORKFLOW")]
    pub ci_workflow: Option<String>,

    #[arg(long, env = "RUNQUEUE_CI_API_BASE")]
    pub ci_api_base: Option<String>,
}

impl DispatchArgs {
    pub fn into_config(self) -> Result<GithubDispatchConfig> {
        let config = GithubDispatchConfig::new(
            self.ci_token,
            self.ci_repository,
            self.ci_ref,
            self.ci_workflow,
        )?;

        Ok(match self.ci_api_base {
            Some(base) if !base.trim().is_empty() => config.with_api_base(base.trim()),
            _ => config,
        })
    }
}

#[derive(Debug, Args)]
pub struct ExternalRunArgs {
    #[arg(long)]
    pub build_id: Option<String>,

    #[arg(long)]
    pub build_url: Option<String>,

    #[arg(long)]
    pub run_id: Option<String>,
}

impl From<ExternalRunArgs> for ExternalRun {
    fn from(args: ExternalRunArgs) -> Self {
        ExternalRun {
            build_id: args.build_id,
            build_url: args.build_url,
            run_id: args.run_id,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutcomeArg {
    Finished,
    Failed,
}

impl From<OutcomeArg> for CompletionOutcome {
    fn from(arg: OutcomeArg) -> Self {
        match arg {
            OutcomeArg::Finished => CompletionOutcome::Finished,
            OutcomeArg::Failed => CompletionOutcome::Failed,
        }
    }
}

/// Build the creation payload from `enqueue` arguments
#[allow(clippy::too_many_arguments)]
pub fn execution_request(
    test_type: String,
    environment: String,
    project_id: Option<String>,
    project_name: Option<String>,
    uid: String,
    display_name: String,
    email: String,
) -> ExecutionRequest {
    ExecutionRequest {
        test_type,
        environment,
        project_id,
        project_name,
        requested_by: Requester {
            uid,
            display_name,
            email,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete() {
        let cli = Cli::try_parse_from([
            "runqueue",
            "--database-url",
            "/tmp/q.db",
            "complete",
            "exec-1",
            "--outcome",
            "failed",
            "--run-id",
            "77",
        ])
        .unwrap();

        assert_eq!(
            database_path(cli.database_url.as_deref()).unwrap(),
            "/tmp/q.db"
        );
        match cli.command {
            Command::Complete {
                execution_id,
                outcome,
                external,
            } => {
                assert_eq!(execution_id, "exec-1");
                assert!(matches!(outcome, OutcomeArg::Failed));
                assert_eq!(ExternalRun::from(external).run_id.as_deref(), Some("77"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_database_url_is_required() {
        for missing in [None, Some(""), Some("   ")] {
            let err = database_path(missing).unwrap_err();
            assert!(matches!(err, AppError::Config(_)));
            assert_eq!(err.stage(), "configuration");
        }
    }

    #[test]
    fn test_database_url_tilde_expanded() {
        let path = database_path(Some("~/queue.db")).unwrap();
        assert!(!path.starts_with('~'));
        assert!(path.ends_with("/queue.db"));
    }

    #[test]
    fn test_parse_serve_interval() {
        let cli = Cli::try_parse_from(["runqueue", "serve", "--interval-secs", "2"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { interval_secs: 2, .. }));
    }

    #[test]
    fn test_dispatch_args_require_token() {
        let args = DispatchArgs {
            ci_token: None,
            ci_repository: Some("acme/shop".to_string()),
            ci_ref: None,
            ci_workflow: None,
            ci_api_base: None,
        };
        let err = args.into_config().unwrap_err();
        assert_eq!(err.stage(), "configuration");
    }

    #[test]
    fn test_dispatch_args_api_base_override() {
        let args = DispatchArgs {
            ci_token: Some("t".to_string()),
            ci_repository: Some("acme/shop".to_string()),
            ci_ref: Some("dev".to_string()),
            ci_workflow: None,
            ci_api_base: Some("http://localhost:9000/".to_string()),
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.git_ref, "dev");
        assert_eq!(
            config.dispatch_url(),
            "http://localhost:9000/repos/acme/shop/actions/workflows/run-tests.yml/dispatches"
        );
    }
}
