//! Retry with exponential backoff.
//!
//! One abstraction serves both unreliable dependencies: the HTTP fetch and
//! the database connect. A policy fixes the attempt ceiling and the time
//! unit; the caller supplies a predicate deciding which errors are worth
//! another attempt.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Attempt ceiling and backoff time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Treated as at least 1.
    pub max_attempts: u32,
    /// One backoff time unit.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait after the `failures`-th consecutive failure:
    /// `base_delay * 2^failures`, so 2, 4, 8, ... units.
    pub fn delay_for_attempt(&self, failures: u32) -> Duration {
        let shift = failures.min(30);
        self.base_delay.saturating_mul(1u32 << shift)
    }

    fn ceiling(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// The last error seen, plus how many attempts were spent getting it.
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} attempt(s))", self.error, self.attempts)
    }
}

/// Runs `operation` until it succeeds, returns a non-retryable error, or the
/// policy's attempt ceiling is reached.
///
/// Every retry is logged at `warn` with the attempt number and the delay.
/// No sleep follows the final attempt.
pub async fn with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let ceiling = policy.ceiling();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= ceiling || !is_retryable(&error) {
                    return Err(RetryError {
                        attempts: attempt,
                        error,
                    });
                }
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:.3}s",
                    label,
                    attempt,
                    ceiling,
                    error,
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }
        }
    }
}
