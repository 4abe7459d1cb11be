//! Retry wrapper for the fetch capability.

use async_trait::async_trait;
use std::time::Duration;
use tracklist_core::config::RetryConfig;
use tracklist_core::ports::{FetchError, Fetcher};

/// Retries `Transport` failures with exponential backoff
///
/// `RateLimited` and `NotFound` are returned immediately: retrying a rate
/// limit only burns more quota, and a missing entity stays missing.
pub struct RetryingFetcher<F> {
    inner: F,
    max_attempts: u32,
    base_delay: Duration,
}

impl<F> RetryingFetcher<F> {
    pub fn new(inner: F, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(inner: F, config: &RetryConfig) -> Self {
        Self::new(
            inner,
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
        )
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[async_trait]
impl<T, F> Fetcher<T> for RetryingFetcher<F>
where
    T: Send + 'static,
    F: Fetcher<T>,
{
    async fn fetch(&self, identifier: &str) -> Result<T, FetchError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch(identifier).await {
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        identifier,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transport error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        error: FetchError,
    }

    #[async_trait]
    impl Fetcher<u32> for Flaky {
        async fn fetch(&self, _identifier: &str) -> Result<u32, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(self.error.clone())
            } else {
                Ok(call)
            }
        }
    }

    fn flaky(failures: u32, error: FetchError) -> Flaky {
        Flaky {
            failures,
            calls: AtomicU32::new(0),
            error,
        }
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let fetcher = RetryingFetcher::new(
            flaky(2, FetchError::Transport("reset".into())),
            3,
            Duration::from_millis(1),
        );
        assert_eq!(fetcher.fetch("acme/widget").await, Ok(3));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let fetcher = RetryingFetcher::new(
            flaky(5, FetchError::Transport("reset".into())),
            3,
            Duration::from_millis(1),
        );
        assert!(fetcher.fetch("acme/widget").await.is_err());
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let fetcher = RetryingFetcher::new(
            flaky(1, FetchError::RateLimited { retry_after: None }),
            5,
            Duration::from_millis(1),
        );
        assert_eq!(
            fetcher.fetch("acme/widget").await,
            Err(FetchError::RateLimited { retry_after: None })
        );
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let fetcher = RetryingFetcher::new(
            flaky(0, FetchError::Transport(String::new())),
            4,
            Duration::from_millis(100),
        );
        assert_eq!(fetcher.delay_for(1), Duration::from_millis(100));
        assert_eq!(fetcher.delay_for(2), Duration::from_millis(200));
        assert_eq!(fetcher.delay_for(3), Duration::from_millis(400));
    }
}
