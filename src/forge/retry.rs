//! forge::retry
//!
//! Fixed-delay retry for operations racing remote replication.
//!
//! A merge request created right after a push can fail because the forge has
//! not yet seen the branch. That window is short, so the delay between
//! attempts is constant rather than exponential:
//!
//! - Default: 4 attempts, 500ms apart (at most 1.5s of waiting)
//! - The last error is returned once attempts run out

use std::future::Future;
use std::time::Duration;

use super::traits::ForgeError;

/// Retry policy with a constant delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,

    /// Pause after each failed attempt that is followed by another.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy for creating a pull request right after a branch push.
    pub const CREATE_AFTER_PUSH: Self = Self {
        max_attempts: 4,
        delay: Duration::from_millis(500),
    };

    /// Single attempt, no waiting.
    pub const NO_RETRY: Self = Self {
        max_attempts: 1,
        delay: Duration::ZERO,
    };

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Upper bound on time spent sleeping between attempts.
    pub fn total_max_wait(&self) -> Duration {
        self.delay * self.max_attempts.max(1).saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::CREATE_AFTER_PUSH
    }
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// `operation` receives the 1-based attempt number. Every error is treated
/// as retryable. When all attempts fail, the error from the last attempt is
/// returned.
pub async fn retry_with_fixed_delay<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, ForgeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ForgeError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < max_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "attempt failed, retrying in {:?}",
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::warn!(attempts = attempt, error = %err, "retries exhausted");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[test]
    fn default_is_create_after_push() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.delay, Duration::from_millis(500));
        assert_eq!(policy.total_max_wait(), Duration::from_millis(1500));
    }

    #[test]
    fn total_max_wait_handles_zero_attempts() {
        let policy = RetryPolicy::new(0, Duration::from_millis(500));
        assert_eq!(policy.total_max_wait(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success() {
        let calls = Cell::new(0);
        let result = retry_with_fixed_delay(RetryPolicy::default(), |_| {
            calls.set(calls.get() + 1);
            async { Ok::<_, ForgeError>("done") }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_when_exhausted() {
        let start = Instant::now();
        let result: Result<(), _> = retry_with_fixed_delay(RetryPolicy::default(), |attempt| async move {
            Err(ForgeError::NetworkError(format!("attempt {}", attempt)))
        })
        .await;

        assert_eq!(result, Err(ForgeError::NetworkError("attempt 4".into())));
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_constant() {
        let start = Instant::now();
        let mut seen = Vec::new();
        let _ = retry_with_fixed_delay(RetryPolicy::default(), |attempt| {
            seen.push((attempt, start.elapsed()));
            async { Err::<(), _>(ForgeError::RateLimited) }
        })
        .await;

        assert_eq!(
            seen,
            vec![
                (1, Duration::ZERO),
                (2, Duration::from_millis(500)),
                (3, Duration::from_millis(1000)),
                (4, Duration::from_millis(1500)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let result: Result<(), _> =
            retry_with_fixed_delay(RetryPolicy::new(0, Duration::from_millis(500)), |_| {
                calls.set(calls.get() + 1);
                async { Err(ForgeError::RateLimited) }
            })
            .await;

        assert_eq!(result, Err(ForgeError::RateLimited));
        assert_eq!(calls.get(), 1);
    }
}
