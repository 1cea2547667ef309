//! Retry execution with capped exponential backoff
//!
//! Only retriable failures (see [`ErrorCategory::is_retriable`]) are retried;
//! permanent errors return unchanged on the first occurrence. The backoff
//! schedule is deterministic so callers can reason about worst-case latency:
//! the delay before attempt `n` is `base_delay * multiplier^(n - 2)`, capped
//! at `max_delay`.
//!
//! [`ErrorCategory::is_retriable`]: crate::error::ErrorCategory::is_retriable

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Retry policy shared across executors
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total tries including the first; values below 1 are treated as 1
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Growth factor per attempt; values below 1.0 are treated as 1.0
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Wall-clock budget for the whole retry loop (None = unbounded)
    pub overall_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            overall_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Set total attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the initial backoff delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the backoff cap
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set a wall-clock budget for the whole retry loop
    pub fn with_overall_timeout(mut self, budget: Duration) -> Self {
        self.overall_timeout = Some(budget);
        self
    }
}

/// Runs operations under a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor for the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy this executor runs under
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is consumed.
    ///
    /// Retriable failures sleep the backoff delay and try again; the final
    /// retriable failure is wrapped in [`Error::RetryExhausted`] carrying the
    /// attempt count and last cause. Permanent failures return unchanged
    /// immediately. When an overall timeout is configured, its expiry
    /// abandons the in-flight attempt and yields [`Error::Timeout`].
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.policy.overall_timeout {
            Some(budget) => match timeout(budget, self.run_attempts(operation)).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(format!(
                    "retry budget of {budget:?} exhausted"
                ))),
            },
            None => self.run_attempts(operation).await,
        }
    }

    async fn run_attempts<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retriable() && attempt < max_attempts => {
                    let delay = calculate_backoff(
                        attempt - 1,
                        self.policy.base_delay,
                        self.policy.max_delay,
                        self.policy.backoff_multiplier,
                    );
                    warn!(
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "retryable failure, backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) if err.is_retriable() => {
                    return Err(Error::retry_exhausted(attempt, err));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Calculate the capped exponential backoff delay.
///
/// `attempt` is zero-based: the delay after the first failure uses
/// `attempt = 0` and equals `base_delay`.
fn calculate_backoff(
    attempt: u32,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
) -> Duration {
    let multiplier = multiplier.max(1.0);
    let delay = base_delay.as_millis() as f64 * multiplier.powi(attempt as i32);
    let capped = delay.min(max_delay.as_millis() as f64);
    Duration::from_millis(capped as u64)
}
