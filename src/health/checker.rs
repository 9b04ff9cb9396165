//! Dependency checker contract.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::BoxError;

/// A probe reporting up/down for one dependency.
///
/// Checkers are registered with the [`HealthMonitor`](super::HealthMonitor)
/// before it starts evaluating; each call is bounded by the monitor's
/// per-check timeout.
#[async_trait]
pub trait DependencyChecker: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, token: CancellationToken) -> Result<(), BoxError>;
}
