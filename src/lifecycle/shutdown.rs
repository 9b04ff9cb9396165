//! Bounded wait for shutdown completion.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum CloseError {
    #[error("shutdown did not complete within {0:?}")]
    DeadlineElapsed(Duration),

    #[error("shutdown completion signal was dropped")]
    Abandoned,
}

/// Waits for the "all workers stopped" signal, but never past its deadline.
///
/// The deadline is an escape valve: once it elapses the caller gets control
/// back even though some workers may still be running.
#[derive(Debug, Clone, Copy)]
pub struct Closer {
    deadline: Duration,
}

impl Closer {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Block until `token` fires, then wait for `done` for at most the deadline.
    pub async fn wait<T>(
        &self,
        token: &CancellationToken,
        done: oneshot::Receiver<T>,
    ) -> Result<T, CloseError> {
        token.cancelled().await;

        match tokio::time::timeout(self.deadline, done).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(_)) => Err(CloseError::Abandoned),
            Err(_) => {
                tracing::warn!(deadline = ?self.deadline, "Shutdown deadline elapsed");
                Err(CloseError::DeadlineElapsed(self.deadline))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn returns_as_soon_as_completion_arrives() {
        let closer = Closer::new(Duration::from_secs(5));
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        token.cancel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send("stopped");
        });

        let start = Instant::now();
        assert_eq!(closer.wait(&token, rx).await.unwrap(), "stopped");
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_the_deadline() {
        let closer = Closer::new(Duration::from_secs(2));
        let token = CancellationToken::new();
        let (_tx, rx) = oneshot::channel::<()>();
        token.cancel();

        let start = Instant::now();
        let err = closer.wait(&token, rx).await.unwrap_err();
        assert!(matches!(err, CloseError::DeadlineElapsed(d) if d == Duration::from_secs(2)));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_cancellation_first() {
        let closer = Closer::new(Duration::from_millis(100));
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());

        let waiter = tokio::spawn({
            let token = token.clone();
            async move { closer.wait(&token, rx).await }
        });
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!waiter.is_finished());

        token.cancel();
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn dropped_sender_is_reported() {
        let closer = Closer::new(Duration::from_secs(1));
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        token.cancel();

        assert!(matches!(
            closer.wait(&token, rx).await,
            Err(CloseError::Abandoned)
        ));
    }
}
