//! Batch resolution over a pool of browser workers.
//!
//! Workers pull tournaments from a shared queue, each on its own browser
//! session. Failures and panics stay inside the tournament that caused them.
//! Resolved URLs are buffered per worker and written once the queue is drained.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::resolver::TournamentResolver;
use crate::browser::{BrowserLauncher, PageFetcher};
use crate::models::{ResolutionOutcome, TournamentTarget};
use crate::repository::{StoreError, TournamentStore};
use crate::retry::RetryPolicy;
use crate::season::SeasonScope;

/// Events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum ResolveEvent {
    /// Worker could not open a browser session and stopped.
    WorkerFailed { worker_id: usize, error: String },
    /// Resolution started for a tournament.
    Started {
        worker_id: usize,
        id: i64,
        name: String,
    },
    /// Tournament reached a terminal outcome.
    Finished {
        worker_id: usize,
        id: i64,
        outcome: ResolutionOutcome,
    },
    /// Worker wrote its buffered URLs.
    Flushed { worker_id: usize, persisted: usize },
}

/// Outcome of one tournament in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentReport {
    pub id: i64,
    pub name: String,
    pub outcome: ResolutionOutcome,
}

/// Result of a batch run, outcomes in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<TournamentReport>,
    /// Signup URLs written to the store.
    pub persisted: usize,
    /// Found URLs whose write failed.
    pub persist_failures: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn found(&self) -> usize {
        self.count(|o| o.is_found())
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| *o == ResolutionOutcome::NotFound)
    }

    pub fn errors(&self) -> usize {
        self.count(|o| matches!(o, ResolutionOutcome::Error(_)))
    }

    fn count(&self, pred: impl Fn(&ResolutionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Apply the season policy to an empty result.
    ///
    /// Nothing resolved in a non-empty current-season batch fails the batch;
    /// in a historical batch it is only reported.
    pub fn check(&self, scope: SeasonScope) -> Result<(), BatchError> {
        if self.total() == 0 || self.found() > 0 {
            return Ok(());
        }
        match scope {
            SeasonScope::Current => Err(BatchError::NothingResolved {
                total: self.total(),
            }),
            SeasonScope::Historical => {
                warn!(
                    "No signup URL resolved for {} historical tournament(s)",
                    self.total()
                );
                Ok(())
            }
        }
    }
}

/// Batch-level failures.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no signup URL resolved for any of {total} current-season tournament(s)")]
    NothingResolved { total: usize },
}

/// Worker pool settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub workers: usize,
    pub navigation_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            navigation_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

struct WorkerResult {
    reports: Vec<(usize, TournamentReport)>,
    persisted: usize,
    persist_failures: usize,
}

/// Runs the resolver over a batch of tournaments.
pub struct Orchestrator {
    launcher: Arc<dyn BrowserLauncher>,
    resolver: Arc<TournamentResolver>,
    store: Arc<dyn TournamentStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        resolver: Arc<TournamentResolver>,
        store: Arc<dyn TournamentStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            launcher,
            resolver,
            store,
            config,
        }
    }

    /// Load the store's pending tournaments and resolve them.
    pub async fn run_pending(
        &self,
        event_tx: mpsc::Sender<ResolveEvent>,
    ) -> Result<BatchReport, StoreError> {
        let targets = self.store.load_pending().await?;
        info!("{} pending tournament(s)", targets.len());
        Ok(self.run(targets, event_tx).await)
    }

    /// Resolve `targets`. Always completes; per-tournament failures are
    /// recorded in the report.
    pub async fn run(
        &self,
        targets: Vec<TournamentTarget>,
        event_tx: mpsc::Sender<ResolveEvent>,
    ) -> BatchReport {
        let total = targets.len();
        if total == 0 {
            return BatchReport::default();
        }

        let queue = Arc::new(Mutex::new(
            targets.into_iter().enumerate().collect::<VecDeque<_>>(),
        ));
        let workers = self.config.workers.clamp(1, total);
        info!("Resolving {} tournament(s) with {} worker(s)", total, workers);

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let launcher = self.launcher.clone();
            let resolver = self.resolver.clone();
            let store = self.store.clone();
            let queue = queue.clone();
            let retry = self.config.retry.clone();
            let timeout = self.config.navigation_timeout;
            let event_tx = event_tx.clone();

            let handle = tokio::spawn(async move {
                let mut result = WorkerResult {
                    reports: Vec::new(),
                    persisted: 0,
                    persist_failures: 0,
                };

                let session = match launcher.open_session().await {
                    Ok(session) => session,
                    Err(e) => {
                        error!("Worker {} has no browser session: {}", worker_id, e);
                        let _ = event_tx
                            .send(ResolveEvent::WorkerFailed {
                                worker_id,
                                error: e.to_string(),
                            })
                            .await;
                        return result;
                    }
                };
                let fetcher = PageFetcher::new(session, retry, timeout);
                let mut buffer: Vec<(i64, String)> = Vec::new();

                loop {
                    let Some((index, target)) = queue.lock().await.pop_front() else {
                        break;
                    };

                    let _ = event_tx
                        .send(ResolveEvent::Started {
                            worker_id,
                            id: target.id,
                            name: target.name.clone(),
                        })
                        .await;

                    let outcome = match AssertUnwindSafe(resolver.resolve(&fetcher, &target))
                        .catch_unwind()
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(panic) => {
                            let cause = panic_message(panic.as_ref());
                            error!("{}: resolution panicked: {}", target.label(), cause);
                            ResolutionOutcome::Error(format!("panicked: {}", cause))
                        }
                    };

                    match &outcome {
                        ResolutionOutcome::Found(url) => buffer.push((target.id, url.clone())),
                        ResolutionOutcome::NotFound => info!("{}: not found", target.label()),
                        ResolutionOutcome::Error(_) => {}
                    }

                    let _ = event_tx
                        .send(ResolveEvent::Finished {
                            worker_id,
                            id: target.id,
                            outcome: outcome.clone(),
                        })
                        .await;
                    result.reports.push((
                        index,
                        TournamentReport {
                            id: target.id,
                            name: target.name,
                            outcome,
                        },
                    ));
                }

                if !buffer.is_empty() {
                    match store.persist_batch(&buffer).await {
                        Ok(persisted) => {
                            debug!("Worker {} persisted {} URL(s)", worker_id, persisted);
                            result.persisted = persisted;
                        }
                        Err(e) => {
                            error!(
                                "Worker {} failed to persist {} URL(s): {}",
                                worker_id,
                                buffer.len(),
                                e
                            );
                            result.persist_failures = buffer.len();
                        }
                    }
                    let _ = event_tx
                        .send(ResolveEvent::Flushed {
                            worker_id,
                            persisted: result.persisted,
                        })
                        .await;
                }

                fetcher.close().await;
                result
            });
            handles.push(handle);
        }

        let mut indexed = Vec::with_capacity(total);
        let mut report = BatchReport::default();
        for handle in handles {
            match handle.await {
                Ok(result) => {
                    indexed.extend(result.reports);
                    report.persisted += result.persisted;
                    report.persist_failures += result.persist_failures;
                }
                Err(e) => error!("Worker task failed: {}", e),
            }
        }

        // Tournaments no worker could take.
        for (index, target) in queue.lock().await.drain(..) {
            indexed.push((
                index,
                TournamentReport {
                    id: target.id,
                    name: target.name,
                    outcome: ResolutionOutcome::Error("no browser session available".to_string()),
                },
            ));
        }

        indexed.sort_by_key(|(index, _)| *index);
        report.outcomes = indexed.into_iter().map(|(_, r)| r).collect();
        info!(
            "Batch done: {} found, {} not found, {} error(s), {} persisted",
            report.found(),
            report.not_found(),
            report.errors(),
            report.persisted
        );
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
