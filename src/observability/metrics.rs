//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder
//! - Define daemon metrics (health checks, HTTP traffic, worker failures)
//! - Render the exposition format for `/metrics`
//!
//! # Metrics
//! - `health_check_status_total` (counter): checker outcomes by checker, status
//! - `http_requests_total` (counter): requests by server, method, path, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `supervisor_worker_failures_total` (counter): worker start failures
//! - `database_connect_attempts_total` (counter): boot connect attempts by outcome
//!
//! # Design Decisions
//! - Metric updates go through the `metrics` facade; without a recorder they are no-ops
//! - Histogram buckets tuned for typical web latencies

use std::time::Instant;

use metrics::Label;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const HTTP_DURATION: &str = "http_request_duration_seconds";
const HTTP_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(HTTP_DURATION.to_string()), HTTP_BUCKETS)
}

/// Install the global Prometheus recorder and return the render handle.
pub fn install() -> Result<PrometheusHandle, BuildError> {
    let handle = builder()?.install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Build a recorder without installing it globally.
pub fn detached_handle() -> Result<PrometheusHandle, BuildError> {
    Ok(builder()?.build_recorder().handle())
}

/// Record the outcome of one dependency check.
pub fn record_health_check(checker: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    metrics::counter!(
        "health_check_status_total",
        "checker" => checker.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a completed HTTP request.
pub fn record_request(server: &str, method: &str, path: &str, status: u16, start: Instant) {
    let labels = vec![
        Label::new("server", server.to_string()),
        Label::new("method", method.to_string()),
        Label::new("path", path.to_string()),
        Label::new("status", status.to_string()),
    ];
    metrics::counter!("http_requests_total", labels.clone()).increment(1);
    metrics::histogram!(HTTP_DURATION, labels).record(start.elapsed().as_secs_f64());
}

/// Record a worker whose `start` returned an error.
pub fn record_worker_failure(worker: &str) {
    metrics::counter!("supervisor_worker_failures_total", "worker" => worker.to_string())
        .increment(1);
}

/// Record one boot-time database connect attempt.
pub fn record_db_connect_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("database_connect_attempts_total", "outcome" => outcome).increment(1);
}
