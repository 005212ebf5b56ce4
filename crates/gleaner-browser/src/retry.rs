//! Bounded retry with exponential backoff for remote interaction.
//!
//! Every call that crosses into the browser can fail because the page is
//! mid-rerender or the remote end is throttling. `RetryPolicy` retries only
//! the transient classes and re-raises the last error once attempts are
//! exhausted, so a changed page structure fails fast instead of looping.

use crate::error::{DriverError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Maximum number of attempts for a wrapped call.
const DEFAULT_ATTEMPTS: u32 = 3;

/// Base delay for the exponential backoff.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on a single backoff delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Retry policy composed around individual remote-interaction calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with explicit bounds.
    #[must_use]
    pub fn new(attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Run an operation, retrying transient failures with exponential
    /// backoff. Non-transient errors and the final transient error are
    /// returned unchanged.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation = what,
                        attempt = attempt + 1,
                        attempts = self.attempts,
                        error = %e,
                        "transient failure, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Backoff delay for a zero-based attempt index, capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
