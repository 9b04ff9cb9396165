//! Startup gates.
//!
//! A gate holds back the first health evaluation until a slow boot step has
//! resolved, so the process is not reported live before it is.

use std::time::Duration;

use tokio::sync::watch;

/// Create a gate and the handle that opens it.
pub fn startup_gate(name: &'static str) -> (GateOpener, StartupGate) {
    let (tx, rx) = watch::channel(false);
    (GateOpener { tx }, StartupGate { name, rx })
}

/// Opens the paired gate. Dropping it releases waiters as well.
#[derive(Debug)]
pub struct GateOpener {
    tx: watch::Sender<bool>,
}

impl GateOpener {
    pub fn open(self) {
        let _ = self.tx.send(true);
    }
}

/// Resolves once its boot step has finished, successfully or not.
#[derive(Debug, Clone)]
pub struct StartupGate {
    name: &'static str,
    rx: watch::Receiver<bool>,
}

impl StartupGate {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_open(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the gate opens or its opener is dropped.
    pub async fn opened(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|open| *open).await;
    }

    /// Wait for the gate, giving up after `grace`. Returns whether it opened.
    pub async fn opened_within(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.opened()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_releases_waiters() {
        let (opener, gate) = startup_gate("database");
        assert!(!gate.is_open());

        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.opened().await }
        });
        opener.open();
        waiter.await.unwrap();
        assert!(gate.is_open());
    }

    #[tokio::test]
    async fn dropped_opener_does_not_hang() {
        let (opener, gate) = startup_gate("database");
        drop(opener);
        assert!(gate.opened_within(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn grace_bounds_the_wait() {
        let (_opener, gate) = startup_gate("database");
        assert!(!gate.opened_within(Duration::from_millis(100)).await);
    }
}
