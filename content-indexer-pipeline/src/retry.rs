//! Exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::errors::PipelineError;

/// Retry policy with exponential backoff.
///
/// Delays double from `initial_delay_ms` up to `max_delay_ms`. With `jitter`
/// each delay is drawn uniformly from `[0, delay]` (full jitter).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `None` retries forever.
    pub max_retries: Option<u32>,
    /// Initial retry delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Bounded policy for one-shot calls.
    pub fn bounded(max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
            ..Default::default()
        }
    }

    /// Never gives up; used for the long-lived listener connection.
    pub fn unbounded() -> Self {
        Self {
            max_retries: None,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::bounded(0)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let capped = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);

        if self.jitter && capped > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=capped))
        } else {
            Duration::from_millis(capped)
        }
    }

    fn allows_retry(&self, attempt: u32) -> bool {
        self.max_retries.map_or(true, |max| attempt < max)
    }

    /// Run `operation`, retrying while it fails with a transient error.
    ///
    /// Non-transient errors are returned immediately. When the retries are
    /// exhausted the last error is returned.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && self.allows_retry(attempt) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_retries = ?self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
