//! Exponential backoff state for the bootstrap retry loop.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Tracks consecutive failures and hands out the delay before the next attempt.
///
/// `success` resets the failure count, so the delay drops back to the
/// configured minimum. `failed` grows the delay exponentially up to the
/// configured ceiling; jitter never pushes it past the ceiling.
#[derive(Debug, Clone)]
pub struct RetryWaiter {
    config: RetryConfig,
    failures: u32,
}

impl Default for RetryWaiter {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryWaiter {
    /// Create a waiter with no failure history
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record a success and return the delay before the next attempt
    pub fn success(&mut self) -> Duration {
        self.failures = 0;
        self.next_wait()
    }

    /// Record a failure and return the delay before the next attempt
    pub fn failed(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.next_wait()
    }

    /// Consecutive failures recorded since the last success
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// The retry configuration in use
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn next_wait(&self) -> Duration {
        let base = self.config.backoff_for(self.failures);
        if base.is_zero() || self.config.jitter_percent == 0 {
            return base;
        }

        let max_extra = base.as_millis() * u128::from(self.config.jitter_percent) / 100;
        let max_extra = u64::try_from(max_extra).unwrap_or(u64::MAX);
        let extra = rand::thread_rng().gen_range(0..=max_extra);

        (base + Duration::from_millis(extra)).min(self.config.max_wait.max(base))
    }
}
