//! Runqueue - Main Entry Point
//!
//! Composition root: parses the command line, validates configuration,
//! wires the SQLite store and GitHub dispatcher into the core use cases.

mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::time::Duration;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables take precedence
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init_logging()?;
    info!("Runqueue v{} starting...", VERSION);

    // Configuration is validated before the store is touched
    let database_url = cli.database_url.as_deref();
    let database_path = || cli::database_path(database_url).map_err(commands::staged);

    match cli.command {
        Command::Admit { dispatch } => {
            let outcome = commands::admit(database_url, dispatch).await?;
            println!("{}", commands::admission_message(&outcome));
            Ok(())
        }
        Command::Serve {
            dispatch,
            interval_secs,
        } => {
            let interval = Duration::from_secs(interval_secs.max(1));
            commands::serve(database_url, dispatch, interval).await
        }
        Command::Enqueue {
            test_type,
            environment,
            project_id,
            project_name,
            uid,
            display_name,
            email,
        } => {
            let request = cli::execution_request(
                test_type,
                environment,
                project_id,
                project_name,
                uid,
                display_name,
                email,
            );
            commands::enqueue(&database_path()?, request).await
        }
        Command::Complete {
            execution_id,
            outcome,
            external,
        } => {
            commands::complete(&database_path()?, execution_id, outcome.into(), external.into())
                .await
        }
        Command::Attach {
            execution_id,
            external,
        } => commands::attach(&database_path()?, execution_id, external.into()).await,
        Command::Capacity { max_parallel } => {
            commands::capacity(&database_path()?, max_parallel).await
        }
        Command::List => commands::list(&database_path()?).await,
        Command::Watch => commands::watch(&database_path()?).await,
    }
}
