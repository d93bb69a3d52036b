//! Polling retry policy and wait loop.
//!
//! Recently written records are not always immediately visible to a
//! subsequent read. The retrieval path compensates by re-running the query
//! until a predicate holds or a deadline passes. The schedule is an explicit
//! [`RetryPolicy`] value passed into each read operation, never an implicit
//! global.
//!
//! The wait is a cooperative, single-threaded loop: each attempt runs to
//! completion and the loop sleeps between attempts. No connection is held
//! across the sleep; every attempt opens a fresh connection cycle.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::{DbError, DbResult};

/// Default wait budget for polling reads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Scheduling parameters for the polling retrieval engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total wall-clock budget for the wait.
    pub timeout: Duration,
    /// Sleep between attempts; zero means busy-poll.
    pub interval: Duration,
}

impl RetryPolicy {
    /// A policy with the given timeout and a zero interval.
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: Duration::ZERO,
        }
    }

    /// A single-attempt policy: one query, no waiting.
    pub fn no_wait() -> Self {
        Self::timeout(Duration::ZERO)
    }

    /// Sets the sleep interval between attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for RetryPolicy {
    /// 3 second budget, busy-polling.
    fn default() -> Self {
        Self::timeout(DEFAULT_TIMEOUT)
    }
}

/// Runs `attempt` until it yields a value or the policy's deadline passes.
///
/// `attempt` returning `Ok(None)` means "predicate not satisfied yet" and is
/// retried; any `Err` propagates immediately (statement errors are never
/// retried). On expiry, `on_timeout` builds the caller's error from the
/// elapsed budget in milliseconds. A zero timeout still performs exactly one
/// attempt.
pub(crate) async fn wait_until<T, F, Fut>(
    policy: &RetryPolicy,
    waiting_for: &str,
    mut attempt: F,
    on_timeout: impl FnOnce(u64) -> DbError,
) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<Option<T>>>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if let Some(found) = attempt().await? {
            tracing::debug!(waiting_for, attempts, "wait satisfied");
            return Ok(found);
        }

        if Instant::now() >= deadline {
            tracing::warn!(waiting_for, attempts, "wait budget exhausted");
            return Err(on_timeout(policy.timeout.as_millis() as u64));
        }

        if !policy.interval.is_zero() {
            sleep(policy.interval).await;
        } else {
            // stay cooperative even when busy-polling
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::error::RetrievalError;

    use super::*;

    fn timeout_error(timeout_ms: u64) -> DbError {
        RetrievalError::Timeout {
            entity: "Sample".to_string(),
            criteria: "(all)".to_string(),
            timeout_ms,
        }
        .into()
    }

    #[tokio::test]
    async fn test_returns_on_first_success() {
        let result = wait_until(
            &RetryPolicy::default(),
            "test",
            || async { Ok(Some(42)) },
            timeout_error,
        )
        .await
        .unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_no_wait_makes_exactly_one_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let err = wait_until(
            &RetryPolicy::no_wait(),
            "test",
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(None::<u32>)
                }
            },
            timeout_error,
        )
        .await
        .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err,
            DbError::Retrieval(RetrievalError::Timeout { timeout_ms: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_retries_until_predicate_holds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = wait_until(
            &RetryPolicy::timeout(Duration::from_secs(5)),
            "test",
            move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Ok(None)
                    } else {
                        Ok(Some("found"))
                    }
                }
            },
            timeout_error,
        )
        .await
        .unwrap();

        assert_eq!(result, "found");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_errors_propagate_without_retry() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let err = wait_until(
            &RetryPolicy::default(),
            "test",
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<Option<u32>, _>(
                        crate::error::BackendError::Encode {
                            message: "boom".to_string(),
                        }
                        .into(),
                    )
                }
            },
            timeout_error,
        )
        .await
        .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(err, DbError::Backend(_)));
    }
}
