//! Periodic dependency evaluation.
//!
//! # Responsibilities
//! - Hold the registered checkers (append-before-run)
//! - Periodically run every checker under a per-check timeout
//! - Publish a fresh snapshot and the readiness flag

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::HealthConfig;
use crate::health::checker::DependencyChecker;
use crate::health::gate::StartupGate;
use crate::health::snapshot::{CheckerStatus, OverallStatus, StatusSnapshot};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("checker {0} already registered")]
    DuplicateChecker(String),
}

/// Owns the checker set and the published snapshot.
///
/// Registration needs `&mut self`; once the monitor is shared behind an
/// `Arc` for evaluation the set can no longer change.
pub struct HealthMonitor {
    checkers: Vec<Arc<dyn DependencyChecker>>,
    gates: Vec<StartupGate>,
    interval: Duration,
    check_timeout: Duration,
    startup_grace: Duration,
    snapshot: ArcSwap<StatusSnapshot>,
    ready: AtomicBool,
}

impl HealthMonitor {
    pub fn new(interval: Duration, check_timeout: Duration, startup_grace: Duration) -> Self {
        Self {
            checkers: Vec::new(),
            gates: Vec::new(),
            interval,
            check_timeout,
            startup_grace,
            snapshot: ArcSwap::from_pointee(StatusSnapshot::starting()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &HealthConfig) -> Self {
        Self::new(
            config.check_interval(),
            config.check_timeout(),
            config.startup_grace(),
        )
    }

    /// Register a checker. Names must be unique.
    pub fn add_checker(&mut self, checker: Arc<dyn DependencyChecker>) -> Result<(), HealthError> {
        if self.checkers.iter().any(|c| c.name() == checker.name()) {
            return Err(HealthError::DuplicateChecker(checker.name().to_string()));
        }
        tracing::debug!(checker = checker.name(), "Health checker registered");
        self.checkers.push(checker);
        Ok(())
    }

    /// Hold the first evaluation until `gate` opens (or the grace period ends).
    pub fn add_gate(&mut self, gate: StartupGate) {
        self.gates.push(gate);
    }

    pub fn checker_names(&self) -> Vec<&str> {
        self.checkers.iter().map(|c| c.name()).collect()
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.snapshot.load_full()
    }

    /// True once the first evaluation cycle has published.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Run one evaluation cycle and publish its result.
    pub async fn evaluate(&self, token: &CancellationToken) -> Arc<StatusSnapshot> {
        let timeout = self.check_timeout;
        let results = join_all(self.checkers.iter().map(|checker| {
            let token = token.clone();
            async move {
                let status = match time::timeout(timeout, checker.check(token)).await {
                    Ok(Ok(())) => CheckerStatus::healthy(),
                    Ok(Err(e)) => CheckerStatus::unhealthy(e.to_string()),
                    Err(_) => CheckerStatus::unhealthy(format!(
                        "check timed out after {}ms",
                        timeout.as_millis()
                    )),
                };
                (checker.name().to_string(), status)
            }
        }))
        .await;

        let mut checks = BTreeMap::new();
        for (name, status) in results {
            metrics::record_health_check(&name, status.is_healthy());
            if let Some(error) = &status.error {
                tracing::debug!(checker = %name, error = %error, "Dependency check failed");
            }
            checks.insert(name, status);
        }

        let snapshot = Arc::new(StatusSnapshot::from_checks(checks));
        let previous = self.snapshot.swap(snapshot.clone());
        self.ready.store(true, Ordering::Release);

        if previous.overall != snapshot.overall {
            match snapshot.overall {
                OverallStatus::Healthy => tracing::info!(
                    checkers = snapshot.checks.len(),
                    "Health status changed to healthy"
                ),
                _ => tracing::warn!(
                    failing = ?failing(&snapshot),
                    "Health status changed to unhealthy"
                ),
            }
        }

        snapshot
    }

    /// Evaluate on a fixed interval until `token` is cancelled.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        tracing::info!(
            interval = ?self.interval,
            checkers = self.checkers.len(),
            "Health monitor starting"
        );

        if !self.gates.is_empty() {
            let grace = self.startup_grace;
            let gates = join_all(self.gates.iter().map(|gate| async move {
                (gate.name(), gate.opened_within(grace).await)
            }));

            tokio::select! {
                results = gates => {
                    for (gate, opened) in results {
                        if !opened {
                            tracing::warn!(
                                gate,
                                grace = ?grace,
                                "Startup gate still closed after grace period"
                            );
                        }
                    }
                }
                _ = token.cancelled() => return,
            }
        }

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let cycle = async {
                ticker.tick().await;
                self.evaluate(&token).await;
            };
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = cycle => {}
            }
        }
    }
}

fn failing(snapshot: &StatusSnapshot) -> Vec<&str> {
    snapshot
        .checks
        .iter()
        .filter(|(_, s)| !s.is_healthy())
        .map(|(name, _)| name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::gate::startup_gate;
    use crate::health::snapshot::CheckStatus;
    use crate::BoxError;
    use async_trait::async_trait;

    struct Fixed {
        name: String,
        fail: Option<&'static str>,
    }

    fn fixed(name: &str, fail: Option<&'static str>) -> Arc<Fixed> {
        Arc::new(Fixed {
            name: name.to_string(),
            fail,
        })
    }

    #[async_trait]
    impl DependencyChecker for Fixed {
        fn name(&self) -> &str {
            &self.name
        }

        async fn check(&self, _token: CancellationToken) -> Result<(), BoxError> {
            match self.fail {
                Some(msg) => Err(msg.into()),
                None => Ok(()),
            }
        }
    }

    struct Hanging;

    #[async_trait]
    impl DependencyChecker for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn check(&self, _token: CancellationToken) -> Result<(), BoxError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn monitor() -> HealthMonitor {
        HealthMonitor::new(
            Duration::from_millis(100),
            Duration::from_millis(50),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn aggregate_is_unhealthy_iff_some_checker_fails() {
        for (n, m) in [(0usize, 0usize), (3, 0), (3, 1), (4, 4)] {
            let mut mon = monitor();
            for i in 0..n {
                let fail = if i < m { Some("down") } else { None };
                mon.add_checker(fixed(&format!("dep-{i}"), fail)).unwrap();
            }

            let snap = mon.evaluate(&CancellationToken::new()).await;
            assert_eq!(snap.checks.len(), n);
            let expected = if m > 0 {
                OverallStatus::Unhealthy
            } else {
                OverallStatus::Healthy
            };
            assert_eq!(snap.overall, expected, "n={n} m={m}");
        }
    }

    #[tokio::test]
    async fn readiness_flips_after_first_cycle_and_stays() {
        let mut mon = monitor();
        mon.add_checker(fixed("db", Some("refused"))).unwrap();

        assert!(!mon.is_ready());
        assert!(mon.snapshot().is_starting());

        mon.evaluate(&CancellationToken::new()).await;
        assert!(mon.is_ready());
        assert_eq!(mon.snapshot().overall, OverallStatus::Unhealthy);

        mon.evaluate(&CancellationToken::new()).await;
        assert!(mon.is_ready());
        assert!(!mon.snapshot().is_starting());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_checker_is_bounded_by_timeout() {
        let mut mon = monitor();
        mon.add_checker(Arc::new(Hanging)).unwrap();
        mon.add_checker(fixed("cache", None)).unwrap();

        let snap = mon.evaluate(&CancellationToken::new()).await;
        let hanging = &snap.checks["hanging"];
        assert_eq!(hanging.status, CheckStatus::Unhealthy);
        assert_eq!(hanging.error.as_deref(), Some("check timed out after 50ms"));
        assert!(snap.checks["cache"].is_healthy());
    }

    #[test]
    fn duplicate_checker_names_are_rejected() {
        let mut mon = monitor();
        mon.add_checker(fixed("db", None)).unwrap();
        let err = mon.add_checker(fixed("db", None)).unwrap_err();
        assert!(matches!(err, HealthError::DuplicateChecker(ref n) if n == "db"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_publishes_and_stops_on_cancel() {
        let mon = Arc::new(monitor());
        let token = CancellationToken::new();
        let task = tokio::spawn(mon.clone().run(token.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(mon.is_ready());
        assert!(mon.snapshot().is_healthy());

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_an_inflight_cycle() {
        let mut mon = HealthMonitor::new(
            Duration::from_millis(100),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );
        mon.add_checker(Arc::new(Hanging)).unwrap();
        let mon = Arc::new(mon);
        let token = CancellationToken::new();
        let task = tokio::spawn(mon.clone().run(token.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let cancelled_at = tokio::time::Instant::now();
        token.cancel();
        task.await.unwrap();

        assert!(cancelled_at.elapsed() < Duration::from_millis(10));
        assert!(!mon.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_waits_for_startup_gate() {
        let (opener, gate) = startup_gate("database");
        let mut mon = monitor();
        mon.add_gate(gate);
        let mon = Arc::new(mon);
        let token = CancellationToken::new();
        let task = tokio::spawn(mon.clone().run(token.clone()));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!mon.is_ready());

        opener.open();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(mon.is_ready());

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn grace_period_releases_a_stuck_gate() {
        let (_opener, gate) = startup_gate("database");
        let mut mon = monitor();
        mon.add_gate(gate);
        let mon = Arc::new(mon);
        let token = CancellationToken::new();
        let task = tokio::spawn(mon.clone().run(token.clone()));

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(!mon.is_ready());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(mon.is_ready());

        token.cancel();
        task.await.unwrap();
    }
}
