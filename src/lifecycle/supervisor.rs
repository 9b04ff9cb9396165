//! Process supervisor.
//!
//! # Responsibilities
//! - Start every worker concurrently and run the health evaluator
//! - Turn the first worker failure, a termination signal or parent
//!   cancellation into one shutdown sequence
//! - Stop every worker, bounded by the shutdown deadline
//! - Report the outcome once, with a fixed precedence
//!
//! # State Machine
//! ```text
//! Booting → Running → ShuttingDown → Stopped
//! ```
//! `Stopped` is terminal: `run` consumes the supervisor.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use futures_util::future::join_all;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::HealthConfig;
use crate::health::HealthMonitor;
use crate::lifecycle::failure::{failure_channel, FailureReporter, WorkerFailure};
use crate::lifecycle::shutdown::{CloseError, Closer};
use crate::lifecycle::signals;
use crate::service::Service;
use crate::BoxError;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Booting,
    Running,
    ShuttingDown,
    Stopped,
}

/// Stop errors collected from every worker during one shutdown.
#[derive(Debug, Default)]
pub struct StopErrors(pub Vec<(String, BoxError)>);

impl StopErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn workers(&self) -> Vec<&str> {
        self.0.iter().map(|(w, _)| w.as_str()).collect()
    }
}

impl fmt::Display for StopErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} worker(s) failed to stop", self.0.len())?;
        for (worker, error) in &self.0 {
            write!(f, "; {}: {}", worker, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for StopErrors {}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("worker {worker} failed: {source}")]
    Worker {
        worker: String,
        #[source]
        source: BoxError,
    },

    #[error("shutdown incomplete, still running: {}", .pending.join(", "))]
    ShutdownIncomplete { pending: Vec<String> },

    #[error(transparent)]
    Stop(StopErrors),

    #[error("worker {0} registered twice")]
    DuplicateWorker(String),
}

/// What ended the `Running` phase.
enum Trigger {
    Failure(WorkerFailure),
    Cancelled,
    Signal(&'static str),
}

pub struct SupervisorBuilder {
    workers: Vec<Arc<dyn Service>>,
    health: Option<Arc<HealthMonitor>>,
    shutdown_timeout: Duration,
    handle_signals: bool,
    token: CancellationToken,
    reporter: FailureReporter,
    failures: mpsc::UnboundedReceiver<WorkerFailure>,
}

impl SupervisorBuilder {
    fn new() -> Self {
        let (reporter, failures) = failure_channel();
        Self {
            workers: Vec::new(),
            health: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            handle_signals: true,
            token: CancellationToken::new(),
            reporter,
            failures,
        }
    }

    pub fn worker(mut self, worker: Arc<dyn Service>) -> Self {
        self.workers.push(worker);
        self
    }

    pub fn workers(mut self, workers: impl IntoIterator<Item = Arc<dyn Service>>) -> Self {
        self.workers.extend(workers);
        self
    }

    pub fn health(mut self, monitor: Arc<HealthMonitor>) -> Self {
        self.health = Some(monitor);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Listen for SIGTERM/SIGINT while running (on by default).
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Reporter for boot-time background work that must fail the process.
    pub fn reporter(&self) -> FailureReporter {
        self.reporter.clone()
    }

    /// A token cancelled together with the supervisor's own.
    ///
    /// Holders can observe shutdown but cannot trigger it.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let mut seen = std::collections::HashSet::new();
        for worker in &self.workers {
            if !seen.insert(worker.name().to_string()) {
                return Err(SupervisorError::DuplicateWorker(worker.name().to_string()));
            }
        }

        let health = match self.health {
            Some(h) => h,
            None => Arc::new(HealthMonitor::from_config(&HealthConfig::default())),
        };
        let (state, _) = watch::channel(SupervisorState::Booting);

        Ok(Supervisor {
            workers: self.workers,
            health,
            closer: Closer::new(self.shutdown_timeout),
            handle_signals: self.handle_signals,
            token: self.token,
            reporter: self.reporter,
            failures: self.failures,
            state,
        })
    }
}

/// Owns the workers, the health evaluator and the cancellation token.
pub struct Supervisor {
    workers: Vec<Arc<dyn Service>>,
    health: Arc<HealthMonitor>,
    closer: Closer,
    handle_signals: bool,
    token: CancellationToken,
    reporter: FailureReporter,
    failures: mpsc::UnboundedReceiver<WorkerFailure>,
    state: watch::Sender<SupervisorState>,
}

impl Supervisor {
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn health(&self) -> Arc<HealthMonitor> {
        self.health.clone()
    }

    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name()).collect()
    }

    /// Run until shutdown completes.
    ///
    /// Cancelling `parent` requests a clean shutdown. The returned error, if
    /// any, follows this precedence: the first worker failure, then an
    /// incomplete shutdown, then the aggregated stop errors.
    pub async fn run(self, parent: CancellationToken) -> Result<(), SupervisorError> {
        let Supervisor {
            workers,
            health,
            closer,
            handle_signals,
            token,
            reporter,
            mut failures,
            state,
        } = self;

        state.send_replace(SupervisorState::Running);
        tracing::info!(
            workers = workers.len(),
            checkers = health.checker_names().len(),
            "Supervisor running"
        );

        let evaluator = tokio::spawn(health.clone().run(token.clone()).in_current_span());
        let running: Vec<(Arc<dyn Service>, JoinHandle<()>)> = workers
            .iter()
            .map(|worker| {
                let handle = spawn_worker(worker.clone(), token.clone(), reporter.clone());
                (worker.clone(), handle)
            })
            .collect();

        let trigger = tokio::select! {
            biased;
            failure = failures.recv() => match failure {
                Some(f) => Trigger::Failure(f),
                None => Trigger::Cancelled,
            },
            _ = parent.cancelled() => Trigger::Cancelled,
            signal = signals::termination(), if handle_signals => Trigger::Signal(signal),
        };

        token.cancel();
        state.send_replace(SupervisorState::ShuttingDown);

        let first_failure = match trigger {
            Trigger::Failure(f) => {
                tracing::warn!(worker = %f.worker, "Shutting down after worker failure");
                Some(f)
            }
            Trigger::Cancelled => {
                tracing::info!("Shutdown requested");
                None
            }
            Trigger::Signal(signal) => {
                tracing::info!(signal, "Received termination signal, shutting down");
                None
            }
        };

        let pending: Arc<DashSet<String>> =
            Arc::new(workers.iter().map(|w| w.name().to_string()).collect());
        let mut aborts: Vec<AbortHandle> = running.iter().map(|(_, h)| h.abort_handle()).collect();
        aborts.push(evaluator.abort_handle());

        let stop_deadline = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();
        let stopper = tokio::spawn(
            stop_all(running, evaluator, pending.clone(), stop_deadline.clone(), done_tx)
                .in_current_span(),
        );

        let stop_errors = match closer.wait(&token, done_rx).await {
            Ok(errors) if errors.is_empty() => {
                tracing::info!("All workers stopped");
                errors
            }
            Ok(errors) => {
                tracing::error!(
                    workers = ?errors.workers(),
                    error = %errors,
                    "Workers failed to stop cleanly"
                );
                errors
            }
            Err(e) => {
                stop_deadline.cancel();
                stopper.abort();
                for handle in &aborts {
                    handle.abort();
                }
                let mut still_running: Vec<String> =
                    pending.iter().map(|n| n.key().clone()).collect();
                still_running.sort();
                if !matches!(e, CloseError::DeadlineElapsed(_)) {
                    tracing::error!(error = %e, "Shutdown coordination failed");
                }
                // Every worker may have acknowledged just as the deadline fired.
                let incomplete = if still_running.is_empty() {
                    tracing::warn!(error = %e, "Stop results lost, every worker acknowledged");
                    None
                } else {
                    tracing::error!(
                        pending = ?still_running,
                        "Abandoning workers that did not stop"
                    );
                    Some(still_running)
                };
                return finish(
                    &state,
                    &mut failures,
                    first_failure,
                    incomplete,
                    StopErrors::default(),
                );
            }
        };

        finish(&state, &mut failures, first_failure, None, stop_errors)
    }
}

fn spawn_worker(
    worker: Arc<dyn Service>,
    token: CancellationToken,
    reporter: FailureReporter,
) -> JoinHandle<()> {
    let span = tracing::info_span!("worker", name = %worker.name());
    tokio::spawn(
        async move {
            tracing::debug!("Worker starting");
            match AssertUnwindSafe(worker.start(token.clone())).catch_unwind().await {
                Ok(Ok(())) if token.is_cancelled() => tracing::debug!("Worker exited"),
                Ok(Ok(())) => tracing::warn!("Worker exited before shutdown"),
                Ok(Err(e)) => reporter.report(worker.name(), e),
                Err(_) => reporter.report(worker.name(), "worker panicked"),
            }
        }
        .instrument(span),
    )
}

/// Stop every worker concurrently and wait for their `start` calls to
/// return. The evaluator is not a worker and is aborted afterwards.
async fn stop_all(
    running: Vec<(Arc<dyn Service>, JoinHandle<()>)>,
    evaluator: JoinHandle<()>,
    pending: Arc<DashSet<String>>,
    deadline: CancellationToken,
    done: oneshot::Sender<StopErrors>,
) {
    let stops = running.into_iter().map(|(worker, handle)| {
        let pending = pending.clone();
        let deadline = deadline.clone();
        async move {
            let result = worker.stop(deadline).await;
            let _ = handle.await;
            pending.remove(worker.name());
            tracing::debug!(worker = worker.name(), "Worker acknowledged stop");
            result.err().map(|e| (worker.name().to_string(), e))
        }
    });

    let errors: Vec<_> = join_all(stops).await.into_iter().flatten().collect();
    evaluator.abort();
    let _ = done.send(StopErrors(errors));
}

fn finish(
    state: &watch::Sender<SupervisorState>,
    failures: &mut mpsc::UnboundedReceiver<WorkerFailure>,
    first_failure: Option<WorkerFailure>,
    pending: Option<Vec<String>>,
    stop_errors: StopErrors,
) -> Result<(), SupervisorError> {
    // Later failures were already logged by the reporter.
    while let Ok(late) = failures.try_recv() {
        tracing::debug!(worker = %late.worker, "Ignoring failure reported during shutdown");
    }

    state.send_replace(SupervisorState::Stopped);
    tracing::info!("Supervisor stopped");

    if let Some(f) = first_failure {
        return Err(SupervisorError::Worker {
            worker: f.worker,
            source: f.error,
        });
    }
    if let Some(pending) = pending {
        return Err(SupervisorError::ShutdownIncomplete { pending });
    }
    if !stop_errors.is_empty() {
        return Err(SupervisorError::Stop(stop_errors));
    }
    Ok(())
}
