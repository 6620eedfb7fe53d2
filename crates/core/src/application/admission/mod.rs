// Admission Worker - promotes at most one waiting execution per invocation

pub mod constants;
pub mod decision;

use constants::*;

use crate::domain::{CapacityAccount, QueueEntry};
use crate::error::{AppError, Result};
use crate::port::{Dispatcher, TimeProvider, TransactionalQueueRepository};
use crate::shutdown::ShutdownToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Result of one admission decision. Only `Admitted` mutated the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Entry committed as running and handed to the dispatcher
    Admitted(QueueEntry),
    /// running_count >= max_parallel
    NoCapacity(CapacityAccount),
    /// No waiting entry
    EmptyQueue,
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionOutcome::Admitted(_))
    }
}

impl std::fmt::Display for AdmissionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionOutcome::Admitted(entry) => write!(f, "admitted execution {}", entry.id),
            AdmissionOutcome::NoCapacity(account) => write!(
                f,
                "no capacity available ({}/{} running)",
                account.running_count, account.max_parallel
            ),
            AdmissionOutcome::EmptyQueue => write!(f, "queue empty"),
        }
    }
}

/// Stateless admission worker. Any number of invocations may overlap;
/// the store's transaction isolation keeps the capacity invariant.
pub struct AdmissionWorker {
    tx_repo: Arc<dyn TransactionalQueueRepository>,
    dispatcher: Arc<dyn Dispatcher>,
    time_provider: Arc<dyn TimeProvider>,
}

impl AdmissionWorker {
    pub fn new(
        tx_repo: Arc<dyn TransactionalQueueRepository>,
        dispatcher: Arc<dyn Dispatcher>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            tx_repo,
            dispatcher,
            time_provider,
        }
    }

    /// One invocation: at most one admission, then dispatch outside the transaction.
    ///
    /// # Errors
    /// - Store errors from the decision (after conflict retries are exhausted)
    /// - `AppError::Dispatch` when the CI call fails. The entry stays running
    ///   and its capacity slot stays taken; nothing is compensated.
    pub async fn run_once(&self) -> Result<AdmissionOutcome> {
        let outcome = self.decide().await?;

        if let AdmissionOutcome::Admitted(entry) = &outcome {
            self.dispatch(entry).await?;
        }

        Ok(outcome)
    }

    /// Decision with bounded retry on transaction conflicts
    async fn decide(&self) -> Result<AdmissionOutcome> {
        let mut attempt = 1;
        loop {
            match decision::execute(self.tx_repo.as_ref(), self.time_provider.as_ref()).await {
                Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_ATTEMPTS => {
                    warn!(
                        attempt = attempt,
                        error = %e,
                        "Admission transaction conflicted, retrying"
                    );
                    attempt += 1;
                    sleep(CONFLICT_RETRY_DELAY).await;
                }
                result => return result,
            }
        }
    }

    async fn dispatch(&self, entry: &QueueEntry) -> Result<()> {
        match self.dispatcher.dispatch(&entry.id).await {
            Ok(()) => {
                info!(execution_id = %entry.id, "Execution dispatched");
                Ok(())
            }
            Err(source) => {
                error!(
                    execution_id = %entry.id,
                    error = %source,
                    "Dispatch failed; execution remains running"
                );
                Err(AppError::Dispatch {
                    execution_id: entry.id.clone(),
                    source,
                })
            }
        }
    }

    /// Timer-driven invocations until shutdown.
    ///
    /// After an admission the next invocation runs immediately; otherwise
    /// the loop waits `interval`. Failed invocations are logged, never fatal.
    pub async fn run(&self, interval: Duration, mut shutdown: ShutdownToken) -> Result<()> {
        info!(interval_ms = interval.as_millis() as u64, "Admission worker started");
        loop {
            if shutdown.is_shutdown() {
                info!("Admission worker shutting down");
                break;
            }
            match self.run_once().await {
                Ok(outcome) => {
                    debug!(outcome = %outcome, "Admission tick");
                    if !outcome.is_admitted() {
                        tokio::select! {
                            _ = sleep(interval) => {},
                            _ = shutdown.wait() => {
                                info!("Admission worker interrupted during idle");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(stage = e.stage(), error = %e, "Admission tick failed");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Admission worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!("Admission worker stopped");
        Ok(())
    }
}
