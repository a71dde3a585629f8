// Retry policy for XML API calls.
//
// Wraps a single request in bounded attempts with exponential backoff and
// jitter. Only errors classified by `Error::is_transient` are retried; a
// device-side rejection surfaces on the first attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::Error;

/// Bounded retry with exponential backoff.
///
/// `delay(n) = min(initial * 2^(n-1) * (1 + jitter), max)` where jitter is
/// drawn from `[0, jitter_factor)`. With `jitter_factor < 1` the delays are
/// strictly increasing until the cap.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first. `0` is treated as `1`.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Clamped to `[0.0, 0.99]`.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter_factor: 0.25,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based: the wait after the first failure).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1).min(30)).unwrap_or(30);
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);

        let jitter_factor = self.jitter_factor.clamp(0.0, 0.99);
        let jitter = if jitter_factor > 0.0 {
            rand::rng().random_range(0.0..jitter_factor)
        } else {
            0.0
        };

        let delay = (base * (1.0 + jitter)).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(20),
            jitter_factor: 0.5,
        }
    }

    #[test]
    fn backoff_strictly_increases_below_cap() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            jitter_factor: 0.9,
        };
        for _ in 0..50 {
            let delays: Vec<_> = (1..=5).map(|n| policy.delay_for(n)).collect();
            for pair in delays.windows(2) {
                assert!(pair[1] > pair[0], "{delays:?} is not strictly increasing");
            }
        }
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(2),
            ..RetryPolicy::default()
        };
        assert!(policy.delay_for(40) <= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn retries_transient_until_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Error> = fast_policy(3)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Timeout { after: None })
            })
            .await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_attempted_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Error> = fast_policy(5)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::DeviceApi {
                    code: Some(crate::xmlapi::codes::BAD_XPATH),
                    message: "bad xpath".into(),
                    xpath: None,
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let value = fast_policy(3)
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Http {
                        status: 502,
                        message: "bad gateway".into(),
                    })
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(value.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
