//! Retry with linear backoff for navigation and search calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ErrorKind, ResolveError};

/// Retry configuration, shared by every wrapped call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay unit; attempt `n` failing transiently sleeps `n * base_delay`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: base_delay.as_millis() as u64,
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn classify(&self, error: &ResolveError) -> ErrorKind {
        error.kind()
    }

    /// Run `op` until it succeeds, fails non-transiently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ResolveError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ResolveError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if self.classify(&e) != ErrorKind::Transient || attempt >= max_attempts {
                        if attempt > 1 {
                            warn!("{} failed after {} attempt(s): {}", what, attempt, e);
                        }
                        return Err(e);
                    }
                    let delay = self.base_delay() * attempt;
                    debug!(
                        "{} attempt {}/{} failed ({}), retrying in {:?}",
                        what, attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> ResolveError {
        ResolveError::Network {
            url: "https://club.fr".into(),
            reason: "connection reset".into(),
        }
    }

    async fn fail_times(policy: &RetryPolicy, failures: u32) -> (Result<u32, ResolveError>, u32) {
        let calls = AtomicU32::new(0);
        let result = policy
            .run("test call", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt <= failures {
                        Err(transient())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let (result, calls) = fail_times(&policy, 2).await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let (result, calls) = fail_times(&policy, 5).await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn structural_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy
            .run("skip", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ResolveError::Skipped("https://facebook.com".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_linearly() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        let (_, calls) = fail_times(&policy, 10).await;
        assert_eq!(calls, 3);
        // 2s after the first failure, 4s after the second.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }
}
