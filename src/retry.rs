use std::future::Future;
use std::time::Duration;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Fixed-interval retry configuration. `max_attempts` counts every attempt,
/// including the first.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, delay_secs: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay_secs,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Retry an async operation at a fixed interval.
///
/// - `config`: retry configuration
/// - `classifier`: inspects an error and returns `Retry` or `Abort`
/// - `operation`: the async closure to retry, given the 1-based attempt number
///
/// Returns the first `Ok` result, or the last error if attempts are exhausted
/// or the classifier returns `Abort`.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if classifier(&e) == RetryAction::Abort || attempt >= total_attempts {
                    return Err(e);
                }
                tracing::warn!(
                    "Attempt {}/{} failed, retrying in {}s: {}",
                    attempt,
                    total_attempts,
                    config.delay_secs,
                    e
                );
                tokio::time::sleep(config.delay()).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn instant(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            delay_secs: 0,
        }
    }

    #[test]
    fn test_new_clamps_to_one_attempt() {
        assert_eq!(RetryConfig::new(0, 2).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let result: Result<i32, String> =
            retry_with_backoff(&instant(3), |_| RetryAction::Retry, |_| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_abort_on_non_retryable() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let result: Result<i32, String> = retry_with_backoff(
            &instant(3),
            |_| RetryAction::Abort,
            |_| {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let result: Result<u32, String> = retry_with_backoff(
            &instant(3),
            |_| RetryAction::Retry,
            |attempt| async move {
                if attempt < 3 {
                    Err("transient".to_string())
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let result: Result<i32, String> = retry_with_backoff(
            &instant(2),
            |_| RetryAction::Retry,
            |attempt| {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err(format!("still failing ({attempt})"))
                }
            },
        )
        .await;
        // Two attempts in total; the last error wins
        assert_eq!(result.unwrap_err(), "still failing (2)");
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_between_attempts() {
        let config = RetryConfig::new(3, 2);
        let start = tokio::time::Instant::now();
        let result: Result<(), String> =
            retry_with_backoff(&config, |_| RetryAction::Retry, |_| async {
                Err("down".to_string())
            })
            .await;
        assert!(result.is_err());
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
