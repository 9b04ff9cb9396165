//! Exponential backoff with jitter, bounded by an overall deadline.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Retry schedule: growing delays, capped per step, with a wall-clock budget
/// for the whole operation.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, timeout: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            timeout,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        )
    }
}

/// Errors returned by [`retry_with_deadline`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The overall budget ran out before any attempt succeeded.
    #[error("timed out after {attempts} attempts in {elapsed:?}")]
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        #[source]
        last_error: Option<E>,
    },

    /// Retrying was abandoned because the token fired.
    #[error("retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Run `op` until it succeeds, the policy timeout elapses, or `cancel` fires.
///
/// The first attempt always runs. Before every further attempt the elapsed
/// time is compared against the budget; once exceeded the retry loop stops
/// for good. Sleeps never overshoot the remaining budget.
pub async fn retry_with_deadline<T, E, F, Fut>(
    policy: BackoffPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = tokio::time::Instant::now();
    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        let elapsed = started.elapsed();
        if attempts > 0 && elapsed >= policy.timeout {
            return Err(RetryError::TimedOut {
                attempts,
                elapsed,
                last_error,
            });
        }

        attempts += 1;
        let outcome = tokio::select! {
            res = op(attempts) => res,
            _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => {
                let remaining = policy.timeout.saturating_sub(started.elapsed());
                let delay = policy.delay_for(attempts).min(remaining);
                tracing::debug!(
                    attempt = attempts,
                    delay = ?delay,
                    error = %e,
                    "Attempt failed, backing off"
                );
                last_error = Some(e);

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
                }
            }
        }
    }
}
