//! Uniform retry policy for outbound calls.

use crate::backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;

/// How a failed attempt is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Return the error to the caller.
    Fail,
    /// Try again after the next backoff delay.
    Retry,
    /// Try again, but not before the given wait. Waits longer than the
    /// backoff cap are not honoured; the error is returned instead.
    RetryAfter(Duration),
}

/// Bounded retry with exponential backoff.
///
/// Only errors the caller classifies as retryable are retried; anything else
/// is returned after the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: ExponentialBackoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: ExponentialBackoff::new(Duration::from_millis(200), Duration::from_secs(5), 0.1),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; zero is treated as one.
    pub fn new(max_attempts: u32, backoff: ExponentialBackoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(1, ExponentialBackoff::default())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Longest wait this policy accepts between attempts.
    pub fn max_wait(&self) -> Duration {
        self.backoff.max_delay()
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    pub async fn run<T, E, F, Fut, R>(&self, operation: &str, op: F, is_retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        self.run_classified(operation, op, |e| {
            if is_retryable(e) {
                RetryDecision::Retry
            } else {
                RetryDecision::Fail
            }
        })
        .await
    }

    /// Like [`RetryPolicy::run`], with the error mapped to a [`RetryDecision`]
    /// so the server can dictate the wait.
    pub async fn run_classified<T, E, F, Fut, C>(
        &self,
        operation: &str,
        mut op: F,
        classify: C,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDecision,
        E: std::fmt::Display,
    {
        let mut backoff = self.backoff.restarted();
        let mut attempt = 1;

        loop {
            let e = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if attempt >= self.max_attempts {
                return Err(e);
            }

            let delay = match classify(&e) {
                RetryDecision::Fail => return Err(e),
                RetryDecision::Retry => backoff.next_delay(),
                RetryDecision::RetryAfter(wait) if wait > self.max_wait() => {
                    tracing::warn!(
                        operation = %operation,
                        wait_ms = wait.as_millis() as u64,
                        max_wait_ms = self.max_wait().as_millis() as u64,
                        error = %e,
                        "Requested wait exceeds retry budget, giving up"
                    );
                    return Err(e);
                }
                RetryDecision::RetryAfter(wait) => wait.max(backoff.next_delay()),
            };

            tracing::warn!(
                operation = %operation,
                attempt = attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %e,
                "Retryable failure, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
