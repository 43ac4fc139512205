//! Retry policy for transient HTTP failures

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Exponential backoff with a bounded number of retries
///
/// Delays double from `backoff_base`: with a 1 s base the retries wait
/// 1 s, 2 s, 4 s, ... capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub backoff_base: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// The delays before each retry: the base, then doubling from there
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let base_ms = u64::try_from(self.backoff_base.as_millis()).unwrap_or(u64::MAX);
        // ExponentialBackoff yields 2^n ms scaled by the factor, starting at 2 * base
        let doubling = ExponentialBackoff::from_millis(2)
            .factor(base_ms)
            .max_delay(self.max_backoff);
        std::iter::once(self.backoff_base.min(self.max_backoff))
            .chain(doubling)
            .take(self.max_retries)
    }
}
