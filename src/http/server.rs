//! HTTP listener as a supervised worker.
//!
//! # Responsibilities
//! - Bind the configured address when the worker starts
//! - Wire up shared middleware (tracing, read/write timeouts)
//! - Drain gracefully on cancellation or `stop`, bounded by the idle timeout
//! - Report when the listener has fully exited

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::{
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::config::HttpTimeouts;
use crate::service::Service;
use crate::BoxError;

/// Lifecycle of one listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    Idle,
    Serving,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("{server} did not stop before the deadline")]
    StopTimeout { server: String },
}

/// An axum listener driven by the supervisor.
pub struct HttpServer {
    name: String,
    bind_address: String,
    router: Router,
    drain_timeout: Duration,
    shutdown: CancellationToken,
    phase: watch::Sender<ServerPhase>,
    local_addr: OnceLock<SocketAddr>,
}

impl HttpServer {
    /// Create a listener serving `router` with the shared middleware stack.
    pub fn new(
        name: impl Into<String>,
        bind_address: impl Into<String>,
        router: Router,
        timeouts: HttpTimeouts,
    ) -> Self {
        let router = router
            .layer(RequestBodyTimeoutLayer::new(timeouts.read()))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeouts.write(),
            ))
            .layer(TraceLayer::new_for_http());
        let (phase, _) = watch::channel(ServerPhase::Idle);

        Self {
            name: name.into(),
            bind_address: bind_address.into(),
            router,
            drain_timeout: timeouts.idle(),
            shutdown: CancellationToken::new(),
            phase,
            local_addr: OnceLock::new(),
        }
    }

    /// Address actually bound, once serving.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    pub fn phase(&self) -> ServerPhase {
        *self.phase.borrow()
    }

    /// Wait until the listener is bound; `None` if it stopped without serving.
    pub async fn serving(&self) -> Option<SocketAddr> {
        let mut rx = self.phase.subscribe();
        loop {
            match *rx.borrow_and_update() {
                ServerPhase::Serving => return self.local_addr(),
                ServerPhase::Stopped => return None,
                ServerPhase::Idle => {}
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }

    fn mark_stopped(&self) {
        self.phase.send_replace(ServerPhase::Stopped);
    }
}

#[async_trait]
impl Service for HttpServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, token: CancellationToken) -> Result<(), BoxError> {
        if self.shutdown.is_cancelled() {
            return Ok(());
        }

        let listener = match TcpListener::bind(&self.bind_address).await {
            Ok(l) => l,
            Err(source) => {
                self.mark_stopped();
                return Err(ServerError::Bind {
                    address: self.bind_address.clone(),
                    source,
                }
                .into());
            }
        };
        let addr = listener.local_addr().map_err(ServerError::Serve)?;
        let _ = self.local_addr.set(addr);

        let serving = self.phase.send_if_modified(|phase| {
            if *phase == ServerPhase::Idle {
                *phase = ServerPhase::Serving;
                true
            } else {
                false
            }
        });
        if !serving {
            // stop() won the race
            return Ok(());
        }

        tracing::info!(server = %self.name, address = %addr, "HTTP server listening");

        let serve = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(shutdown_requested(token.clone(), self.shutdown.clone()))
            .into_future();
        let drain_timeout = self.drain_timeout;
        let drain_deadline = async {
            shutdown_requested(token, self.shutdown.clone()).await;
            tokio::time::sleep(drain_timeout).await;
        };

        let result = tokio::select! {
            res = serve => res.map_err(ServerError::Serve),
            _ = drain_deadline => {
                tracing::warn!(
                    server = %self.name,
                    "Drain deadline elapsed, dropping open connections"
                );
                Ok(())
            }
        };

        self.mark_stopped();
        tracing::info!(server = %self.name, "HTTP server stopped");
        result.map_err(Into::into)
    }

    async fn stop(&self, deadline: CancellationToken) -> Result<(), BoxError> {
        self.shutdown.cancel();
        self.phase.send_if_modified(|phase| {
            if *phase == ServerPhase::Idle {
                *phase = ServerPhase::Stopped;
                true
            } else {
                false
            }
        });

        tokio::select! {
            _ = wait_stopped(self.phase.subscribe()) => Ok(()),
            _ = deadline.cancelled() => Err(ServerError::StopTimeout {
                server: self.name.clone(),
            }
            .into()),
        }
    }
}

async fn shutdown_requested(shared: CancellationToken, own: CancellationToken) {
    tokio::select! {
        _ = shared.cancelled() => {}
        _ = own.cancelled() => {}
    }
}

async fn wait_stopped(mut rx: watch::Receiver<ServerPhase>) {
    while *rx.borrow_and_update() != ServerPhase::Stopped {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::sync::Arc;

    fn server(address: &str) -> Arc<HttpServer> {
        let router = Router::new().route("/ping", get(|| async { "pong" }));
        Arc::new(HttpServer::new("test", address, router, HttpTimeouts::default()))
    }

    #[tokio::test]
    async fn serves_until_token_cancelled() {
        let srv = server("127.0.0.1:0");
        let token = CancellationToken::new();
        let task = tokio::spawn({
            let srv = srv.clone();
            let token = token.clone();
            async move { srv.start(token).await }
        });

        let addr = srv.serving().await.expect("listener bound");
        let body = reqwest::get(format!("http://{}/ping", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pong");

        token.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(srv.phase(), ServerPhase::Stopped);
    }

    #[tokio::test]
    async fn stop_waits_for_listener_exit() {
        let srv = server("127.0.0.1:0");
        let task = tokio::spawn({
            let srv = srv.clone();
            async move { srv.start(CancellationToken::new()).await }
        });
        srv.serving().await.expect("listener bound");

        srv.stop(CancellationToken::new()).await.unwrap();
        assert_eq!(srv.phase(), ServerPhase::Stopped);
        task.await.unwrap().unwrap();

        // idempotent
        srv.stop(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let srv = server("127.0.0.1:0");
        srv.stop(CancellationToken::new()).await.unwrap();
        srv.start(CancellationToken::new()).await.unwrap();
        assert!(srv.local_addr().is_none());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let srv = server(&addr);

        let err = srv.start(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
        srv.stop(CancellationToken::new()).await.unwrap();
    }
}
