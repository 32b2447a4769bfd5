//! Retry loop for optimistic (version-checked) writes.
//!
//! An attempt is an `async` closure returning `Ok(Some(value))` when its
//! conditional write committed, `Ok(None)` when it lost a race and should be
//! re-run from a fresh read, or `Err(_)` to stop immediately.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use typed_builder::TypedBuilder;

/// Attempt cap used on paths reachable from client traffic.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation still contended after {attempts} attempts")]
pub struct RetriesExhausted {
    pub attempts: u32,
}

/// How often and how patiently a contended operation is retried.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct RetryPolicy {
    /// Maximum number of attempts; `None` retries until the operation settles.
    #[builder(default, setter(strip_option))]
    max_attempts: Option<u32>,
    /// Delay after the first lost attempt, doubled after each further one.
    #[builder(default = Duration::ZERO)]
    initial_backoff: Duration,
    #[builder(default = Duration::from_millis(200))]
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Retries forever, yielding between attempts.
    ///
    /// Meant for allocation loops, where every lost race means another
    /// contender committed.
    pub fn unbounded() -> Self {
        Self::builder().build()
    }

    /// Exponential backoff starting at 10ms, giving up after `max_attempts`.
    pub fn capped(max_attempts: u32) -> Self {
        Self::builder()
            .max_attempts(max_attempts.max(1))
            .initial_backoff(Duration::from_millis(10))
            .build()
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Delay before the attempt following the `attempt`-th lost one.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::capped(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Runs `attempt` until it commits, fails, or the policy gives up.
pub async fn retry_contended<T, E, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: From<RetriesExhausted>,
{
    let mut attempts = 0_u32;
    loop {
        attempts += 1;
        if let Some(value) = attempt().await? {
            return Ok(value);
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(RetriesExhausted { attempts }.into());
        }

        let delay = policy.backoff(attempts);
        debug!(
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "conditional write lost a race, retrying"
        );
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }
}
