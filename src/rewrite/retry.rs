//! Exponential backoff around any [`RewriteBackend`].
//!
//! # Retry Strategy
//!
//! - `max_retries` extra attempts after the first failure (0 disables retrying)
//! - Exponential backoff starting at `base_delay`
//! - Delay capped at 30 seconds
//! - Random jitter (0-250ms) added so parallel workers do not retry in lockstep

use super::{RemoteRewrite, RewriteBackend};
use crate::error::Result;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Decorator that retries a failing [`RewriteBackend`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryRewrite<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryRewrite<T>
where
    T: RewriteBackend,
{
    /// Wrap `inner`.
    ///
    /// # Arguments
    ///
    /// * `inner` - The backend to retry
    /// * `max_retries` - Extra attempts after the first failure
    /// * `base_delay` - Delay before the first retry; doubles each time
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryRewrite<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRewrite")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> RewriteBackend for RetryRewrite<T>
where
    T: RewriteBackend,
{
    #[instrument(level = "info", skip_all)]
    async fn rewrite(&self, title: &str, body: &str) -> Result<RemoteRewrite> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.rewrite(title, body).await {
                Ok(rewrite) => return Ok(rewrite),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "rewrite() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "rewrite() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::tests::FlakyBackend;
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let backend = FlakyBackend {
            failures: 2,
            ..Default::default()
        };
        let retry = RetryRewrite::new(backend, 3, StdDuration::from_millis(100));
        let result = retry.rewrite("Title", "Body").await.unwrap();
        assert_eq!(result.title, "Title");
        assert_eq!(retry.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let backend = FlakyBackend {
            failures: 10,
            ..Default::default()
        };
        let retry = RetryRewrite::new(backend, 2, StdDuration::from_millis(100));
        assert!(retry.rewrite("Title", "Body").await.is_err());
        assert_eq!(retry.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_fails_fast() {
        let backend = FlakyBackend {
            failures: 1,
            ..Default::default()
        };
        let retry = RetryRewrite::new(backend, 0, StdDuration::from_secs(60));
        assert!(retry.rewrite("Title", "Body").await.is_err());
        assert_eq!(retry.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryRewrite::new(FlakyBackend::default(), 5, StdDuration::from_secs(1));
        let first = retry.backoff(1);
        assert!(first >= StdDuration::from_secs(1) && first <= StdDuration::from_millis(1250));
        let late = retry.backoff(40);
        assert!(late <= StdDuration::from_millis(30_250));
    }
}
