//! Bounded retry for provider calls.
//!
//! A [`RetryPolicy`] says how many times to try, how long to wait between
//! attempts, and which errors are worth repeating. Waiting goes through a
//! [`Sleeper`] so tests can run the loop without real delays.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use market_data_ingestor::providers::ProviderError;

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles after each failed attempt.
    Exponential,
}

/// How a fallible provider call is repeated.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub delay: Duration,
    /// Delay growth.
    pub backoff: Backoff,
    /// Decides whether an error is worth another attempt.
    pub retryable: fn(&ProviderError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            backoff: Backoff::Fixed,
            retryable: ProviderError::is_retryable,
        }
    }
}

impl RetryPolicy {
    /// Fixed-delay policy with the default retryability rule.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor)
            }
        }
    }
}

/// Something that can wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real waiting on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{label} failed after {attempts} attempt(s): {source}")]
/// The last error of an exhausted (or non-retryable) call.
pub struct RetryError {
    /// What was being attempted, e.g. `"AAPL 2024-06-21"`.
    pub label: String,
    /// Attempts actually made.
    pub attempts: u32,
    /// Error returned by the final attempt.
    pub source: ProviderError,
}

/// Runs `op` until it succeeds, the error is not retryable, or the policy's
/// attempts are used up.
///
/// Every failed attempt is logged with its number and error.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, ProviderError>> + Send,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                let retryable = (policy.retryable)(&err);
                tracing::warn!(
                    label,
                    attempt,
                    max_attempts = max,
                    retryable,
                    error = %err,
                    "attempt failed"
                );
                if !retryable || attempt >= max {
                    tracing::error!(label, attempts = attempt, "giving up");
                    return Err(RetryError {
                        label: label.to_string(),
                        attempts: attempt,
                        source: err,
                    });
                }
                sleeper.sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}
