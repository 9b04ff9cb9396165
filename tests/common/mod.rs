//! Scripted workers and checkers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shortener::health::DependencyChecker;
use shortener::{BoxError, Service};
use tokio_util::sync::CancellationToken;

/// How a scripted worker's `start` behaves.
#[derive(Debug, Clone, Copy)]
pub enum StartPlan {
    /// Run until cancelled.
    UntilCancelled,
    /// Return an error after the delay.
    FailAfter(Duration),
}

/// How a scripted worker's `stop` behaves.
#[derive(Debug, Clone, Copy)]
pub enum StopPlan {
    /// Acknowledge after the delay.
    After(Duration),
    /// Never return.
    Hang,
    /// Return an error immediately.
    Fail,
}

pub struct ScriptedWorker {
    name: String,
    start: StartPlan,
    stop: StopPlan,
    pub stops: AtomicUsize,
}

impl ScriptedWorker {
    pub fn new(name: &str, start: StartPlan, stop: StopPlan) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            start,
            stop,
            stops: AtomicUsize::new(0),
        })
    }

    /// Runs until cancelled and stops after `delay`.
    pub fn well_behaved(name: &str, delay: Duration) -> Arc<Self> {
        Self::new(name, StartPlan::UntilCancelled, StopPlan::After(delay))
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Service for ScriptedWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, token: CancellationToken) -> Result<(), BoxError> {
        match self.start {
            StartPlan::UntilCancelled => {
                token.cancelled().await;
                Ok(())
            }
            StartPlan::FailAfter(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Err(format!("{} crashed", self.name).into()),
                    _ = token.cancelled() => Ok(()),
                }
            }
        }
    }

    async fn stop(&self, _deadline: CancellationToken) -> Result<(), BoxError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        match self.stop {
            StopPlan::After(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            StopPlan::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            StopPlan::Fail => Err("flush failed".into()),
        }
    }
}

/// A checker with a fixed outcome.
pub struct ScriptedChecker {
    name: String,
    error: Option<String>,
    delay: Duration,
}

impl ScriptedChecker {
    pub fn healthy(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            error: None,
            delay: Duration::ZERO,
        })
    }

    pub fn failing(name: &str, error: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            error: Some(error.to_string()),
            delay: Duration::ZERO,
        })
    }

    /// Healthy, but only after `delay`; ignores cancellation.
    pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            error: None,
            delay,
        })
    }
}

#[async_trait]
impl DependencyChecker for ScriptedChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _token: CancellationToken) -> Result<(), BoxError> {
        tokio::time::sleep(self.delay).await;
        match &self.error {
            Some(e) => Err(e.clone().into()),
            None => Ok(()),
        }
    }
}
