//! Bounded retry with exponential backoff and jitter for apply calls.
//!
//! Only errors the caller marks as transient are retried. A conflict or an
//! admission rejection returns on the first attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

/// Backoff settings for talking to the API server.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one (0 = infinite)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failure
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config with a maximum number of attempts
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

/// Run `operation` until it succeeds, `is_transient` rejects the error, or
/// `config.max_attempts` is reached. Returns the last error in the latter two
/// cases.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        let e = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !is_transient(&e) {
            return Err(e);
        }

        if config.exhausted(attempt) {
            error!(
                operation = %operation_name,
                attempt = attempt,
                error = %e,
                "operation failed after max retries"
            );
            return Err(e);
        }

        // 0.5x to 1.5x jitter
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let jittered_delay = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

        warn!(
            operation = %operation_name,
            attempt = attempt,
            error = %e,
            delay_ms = jittered_delay.as_millis(),
            "operation failed, retrying"
        );

        tokio::time::sleep(jittered_delay).await;

        delay = Duration::from_secs_f64(
            (delay.as_secs_f64() * config.backoff_multiplier).min(config.max_delay.as_secs_f64()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn returns_first_success() {
        let result: Result<&str, &str> =
            retry_with_backoff(&fast(3), "apply", || async { Ok("applied") }, |_| true).await;
        assert_eq!(result, Ok("applied"));
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result: Result<u32, &str> = retry_with_backoff(
            &fast(5),
            "apply",
            || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("503")
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result: Result<(), &str> = retry_with_backoff(
            &fast(3),
            "apply",
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("still down")
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err("still down"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let result: Result<(), &str> = retry_with_backoff(
            &fast(5),
            "apply",
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("409 conflict")
                }
            },
            |e| !e.starts_with("409"),
        )
        .await;

        assert_eq!(result, Err("409 conflict"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_attempt_is_exhausted_immediately() {
        let config = RetryConfig::with_max_attempts(1);
        assert!(config.exhausted(1));
        assert!(!RetryConfig::with_max_attempts(0).exhausted(100));
    }
}
