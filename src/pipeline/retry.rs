use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::constants::{RETRY_BASE_DELAY_MS, RETRY_MAX_ATTEMPTS};
use crate::observability::metrics;

/// Bounded retry with exponential backoff.
///
/// The caller decides which failures are worth retrying; anything else is
/// returned on first sight.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay_ms: RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Wait after the `failed_attempt`-th failure (1-based): base × 2^(n-1).
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exp))
    }

    pub async fn run<T, E, F, Fut, P>(&self, label: &str, mut op: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && is_retryable(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable failure: {}",
                        e
                    );
                    metrics::publish::retry(label);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[derive(Debug)]
    enum Failure {
        Transient,
        Permanent,
    }

    impl Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn transient(e: &Failure) -> bool {
        matches!(e, Failure::Transient)
    }

    fn policy() -> RetryPolicy {
        RetryPolicy { max_attempts: 3, base_delay_ms: 500 }
    }

    #[test]
    fn delays_double_each_attempt() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_millis(500));
        assert_eq!(p.delay_for(2), Duration::from_millis(1000));
        assert_eq!(p.delay_for(3), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_one_transient_failure() {
        let calls = Cell::new(0);
        let start = Instant::now();
        let result = policy()
            .run(
                "write",
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n == 1 {
                            Err(Failure::Transient)
                        } else {
                            Ok(n)
                        }
                    }
                },
                transient,
            )
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.get(), 2);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(500) && waited < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), Failure> = policy()
            .run(
                "clear",
                || {
                    calls.set(calls.get() + 1);
                    async { Err(Failure::Permanent) }
                },
                transient,
            )
            .await;
        assert!(matches!(result, Err(Failure::Permanent)));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let start = Instant::now();
        let result: Result<(), Failure> = policy()
            .run(
                "write",
                || {
                    calls.set(calls.get() + 1);
                    async { Err(Failure::Transient) }
                },
                transient,
            )
            .await;
        assert!(matches!(result, Err(Failure::Transient)));
        assert_eq!(calls.get(), 3);
        // 500 + 1000; no sleep after the final attempt
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(1500) && waited < Duration::from_millis(2000));
    }
}
