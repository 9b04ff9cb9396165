//! Health endpoints.
//!
//! | Path       | 200 when                    | otherwise |
//! |------------|-----------------------------|-----------|
//! | `/health`  | overall status is healthy   | 503       |
//! | `/ready`   | first evaluation has run    | 503       |
//! | `/metrics` | always (empty w/o recorder) |           |

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::HealthConfig;
use crate::health::{HealthMonitor, StatusSnapshot};
use crate::http::server::HttpServer;

pub const WORKER_NAME: &str = "health";

#[derive(Clone)]
pub struct HealthState {
    pub monitor: Arc<HealthMonitor>,
    pub metrics: Option<PrometheusHandle>,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

/// The `health` worker: [`router`] behind an [`HttpServer`].
pub fn server(config: &HealthConfig, state: HealthState) -> HttpServer {
    HttpServer::new(
        WORKER_NAME,
        config.bind_address(),
        router(state),
        config.timeouts,
    )
}

async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    let snapshot = state.monitor.snapshot();
    let code = if snapshot.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(StatusSnapshot::clone(&snapshot)))
}

async fn ready(State(state): State<HealthState>) -> impl IntoResponse {
    let snapshot = state.monitor.snapshot();
    let code = if snapshot.is_starting() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(StatusSnapshot::clone(&snapshot)))
}

async fn render_metrics(State(state): State<HealthState>) -> impl IntoResponse {
    let body = state.metrics.as_ref().map(|h| h.render()).unwrap_or_default();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::DependencyChecker;
    use crate::BoxError;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    struct Down;

    #[async_trait]
    impl DependencyChecker for Down {
        fn name(&self) -> &str {
            "cache"
        }

        async fn check(&self, _token: CancellationToken) -> Result<(), BoxError> {
            Err("connection refused".into())
        }
    }

    fn monitor(down: bool) -> Arc<HealthMonitor> {
        let mut monitor = HealthMonitor::new(
            Duration::from_secs(30),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        if down {
            monitor.add_checker(Arc::new(Down)).unwrap();
        }
        Arc::new(monitor)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn both_endpoints_report_starting_before_first_cycle() {
        let state = HealthState {
            monitor: monitor(false),
            metrics: None,
        };
        let app = router(state);

        let (code, body) = get(app.clone(), "/health").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains(r#""status":"starting""#));

        let (code, _) = get(app, "/ready").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn degraded_process_is_ready_but_not_healthy() {
        let monitor = monitor(true);
        monitor.evaluate(&CancellationToken::new()).await;
        let app = router(HealthState {
            monitor,
            metrics: None,
        });

        let (code, body) = get(app.clone(), "/health").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("connection refused"));

        let (code, body) = get(app, "/ready").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains(r#""status":"unhealthy""#));
    }

    #[tokio::test]
    async fn no_checkers_answers_healthy() {
        let monitor = monitor(false);
        monitor.evaluate(&CancellationToken::new()).await;
        let app = router(HealthState {
            monitor,
            metrics: None,
        });

        let (code, body) = get(app.clone(), "/health").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains(r#""status":"healthy""#));

        let (code, _) = get(app, "/ready").await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_empty() {
        let app = router(HealthState {
            monitor: monitor(false),
            metrics: None,
        });
        let (code, body) = get(app, "/metrics").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn metrics_renders_recorder_contents() {
        let handle = crate::observability::metrics::detached_handle().unwrap();
        let app = router(HealthState {
            monitor: monitor(false),
            metrics: Some(handle),
        });
        let (code, _) = get(app, "/metrics").await;
        assert_eq!(code, StatusCode::OK);
    }
}
