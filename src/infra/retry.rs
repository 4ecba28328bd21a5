//! Retry with exponential backoff and jitter.
//!
//! Used by the ledger gateway for read paths. Write paths (transaction
//! submission) are deliberately not retried; see
//! [`crate::infra::traits::ArbitratorGateway::submit_reveal`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial try.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the exponential growth.
    pub max_delay: Duration,
    /// Backoff multiplier per attempt.
    pub multiplier: f64,
    /// Jitter fraction in `[0, 1]`; the computed delay is scaled down by up
    /// to this fraction.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.3,
        }
    }
}

impl RetryConfig {
    /// Fast retries for local operations and tests.
    pub fn fast() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
            jitter: 0.3,
        }
    }

    /// Retries for external HTTP services.
    pub fn external_service() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.5,
        }
    }

    /// Retries for ledger RPC reads.
    pub fn blockchain() -> Self {
        Self {
            max_retries: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.5,
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let scaled = if self.jitter > 0.0 {
            let factor: f64 = rand::thread_rng().gen_range(0.0..self.jitter.clamp(0.0, 1.0));
            capped * (1.0 - factor)
        } else {
            capped
        };

        Duration::from_secs_f64(scaled.max(0.0))
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// Final result (success or the last error).
    pub result: Result<T, E>,
    /// Attempts made; 1 means it succeeded first try.
    pub attempts: u32,
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Executor that runs an operation with backoff.
pub struct Retry {
    config: RetryConfig,
}

impl Retry {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `operation`, retrying every failure.
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.run_with_predicate(operation, |_| true).await
    }

    /// Run `operation`, retrying only failures for which `should_retry`
    /// returns true.
    pub async fn run_with_predicate<F, Fut, T, E, P>(
        &self,
        operation: F,
        should_retry: P,
    ) -> RetryResult<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match operation().await {
                Ok(value) => {
                    return RetryResult {
                        result: Ok(value),
                        attempts,
                    }
                }
                Err(err) => {
                    let retries_used = attempts - 1;
                    if retries_used >= self.config.max_retries || !should_retry(&err) {
                        return RetryResult {
                            result: Err(err),
                            attempts,
                        };
                    }
                    let delay = self.config.delay_for_attempt(retries_used);
                    debug!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_grows_and_is_capped() {
        let config = RetryConfig {
            jitter: 0.0,
            ..RetryConfig::fast()
        };

        let first = config.delay_for_attempt(0);
        let second = config.delay_for_attempt(1);
        assert!(second > first);

        let huge = config.delay_for_attempt(30);
        assert!(huge <= config.max_delay);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let retry = Retry::new(RetryConfig::fast());

        let outcome = retry
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient")
                } else {
                    Ok(n)
                }
            })
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn predicate_stops_retrying() {
        let calls = AtomicU32::new(0);
        let retry = Retry::new(RetryConfig::fast());

        let outcome = retry
            .run_with_predicate(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("permanent")
                },
                |err| *err != "permanent",
            )
            .await;

        assert!(!outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_then_returns_last_error() {
        let retry = Retry::new(RetryConfig::fast().with_max_retries(2));

        let outcome = retry.run(|| async { Err::<(), _>("down") }).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 3);
    }
}
