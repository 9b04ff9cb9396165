//! Boot-time connectivity check.
//!
//! Runs in the background so the rest of boot is not held up by database
//! latency. Whatever the outcome, the startup gate is released; a timeout is
//! reported as a failure and shuts the process down.

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::database::checker::ping;
use crate::health::GateOpener;
use crate::lifecycle::FailureReporter;
use crate::observability::metrics;
use crate::resilience::{retry_with_deadline, BackoffPolicy, RetryError};

pub const WORKER_NAME: &str = "database";

/// Spawn the connect loop. The task ends on success, failure or cancellation.
pub fn spawn_connect(
    pool: PgPool,
    policy: BackoffPolicy,
    gate: GateOpener,
    failures: FailureReporter,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let outcome = retry_with_deadline(policy, &token, |attempt| {
                let pool = pool.clone();
                async move {
                    let res = ping(&pool).await;
                    metrics::record_db_connect_attempt(res.is_ok());
                    if let Err(e) = &res {
                        tracing::warn!(attempt, error = %e, "Database not reachable yet");
                    }
                    res
                }
            })
            .await;

            gate.open();

            match outcome {
                Ok(()) => tracing::info!("Database connection established"),
                Err(RetryError::Cancelled { attempts }) => {
                    tracing::debug!(attempts, "Database connect abandoned on shutdown")
                }
                Err(e) => failures.report(WORKER_NAME, e),
            }
        }
        .instrument(tracing::info_span!("db_connect")),
    )
}
