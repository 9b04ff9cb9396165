//! Worker failure reporting.
//!
//! Anything that can fail the whole process while it runs (a worker's
//! `start`, the background database connect) reports through a
//! [`FailureReporter`]. The supervisor acts on the first report only.

use tokio::sync::mpsc;

use crate::observability::metrics;
use crate::BoxError;

/// A fatal error attributed to one named unit.
#[derive(Debug)]
pub struct WorkerFailure {
    pub worker: String,
    pub error: BoxError,
}

/// Cloneable sending half of the failure channel.
#[derive(Debug, Clone)]
pub struct FailureReporter {
    tx: mpsc::UnboundedSender<WorkerFailure>,
}

pub fn failure_channel() -> (FailureReporter, mpsc::UnboundedReceiver<WorkerFailure>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FailureReporter { tx }, rx)
}

impl FailureReporter {
    pub fn report(&self, worker: impl Into<String>, error: impl Into<BoxError>) {
        let failure = WorkerFailure {
            worker: worker.into(),
            error: error.into(),
        };
        tracing::error!(worker = %failure.worker, error = %failure.error, "Worker failed");
        metrics::record_worker_failure(&failure.worker);

        // Receiver gone means the supervisor already finished.
        let _ = self.tx.send(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_arrive_in_order() {
        let (reporter, mut rx) = failure_channel();
        reporter.report("web", "bind failed");
        reporter.clone().report("database", "timed out");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.worker, "web");
        assert_eq!(first.error.to_string(), "bind failed");
        assert_eq!(rx.recv().await.unwrap().worker, "database");
    }

    #[test]
    fn reporting_after_receiver_dropped_is_harmless() {
        let (reporter, rx) = failure_channel();
        drop(rx);
        reporter.report("web", "late");
    }
}
