//! Bounded retry with a fixed delay.
//!
//! Launch, navigation, and verification all share the same retry shape, so the
//! policy lives in one place instead of being re-rolled at each call site.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

/// Run `op` up to `policy.attempts` times, sleeping `policy.delay` between
/// failures. Returns the first success or the last error.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut op: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.attempts => {
                warn!(
                    target = "dreambridge",
                    attempt,
                    error = %err,
                    "{what} failed, attempts exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                warn!(
                    target = "dreambridge",
                    attempt,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "{what} failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn returns_first_success_without_further_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> =
            retry(RetryPolicy::new(3, Duration::from_millis(1)), "op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> =
            retry(RetryPolicy::new(3, Duration::from_millis(1)), "op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("boom".to_string())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> =
            retry(RetryPolicy::new(3, Duration::from_millis(1)), "op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("fail {n}")) }
            })
            .await;
        assert_eq!(result.unwrap_err(), "fail 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let result: Result<u32, String> =
            retry(RetryPolicy::new(0, Duration::ZERO), "op", || async {
                Ok(1)
            })
            .await;
        assert_eq!(result.unwrap(), 1);
    }
}
