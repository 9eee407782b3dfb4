//! Client configuration types.

use std::time::Duration;

/// Backoff configuration for the bootstrap retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Consecutive failures tolerated before backing off
    pub min_failures: u32,

    /// Minimum delay between attempts
    pub min_wait: Duration,

    /// Maximum delay between attempts
    pub max_wait: Duration,

    /// Random stagger added to each backed-off delay, as a percentage
    pub jitter_percent: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfig {
    /// Create the default retry configuration: one free failure, no minimum
    /// wait, ten minute ceiling and 25% stagger
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_failures: 1,
            min_wait: Duration::ZERO,
            max_wait: Duration::from_secs(600),
            jitter_percent: 25,
        }
    }

    /// Set the failures tolerated before backing off
    #[must_use]
    pub const fn min_failures(mut self, failures: u32) -> Self {
        self.min_failures = failures;
        self
    }

    /// Set the minimum delay
    #[must_use]
    pub const fn min_wait(mut self, duration: Duration) -> Self {
        self.min_wait = duration;
        self
    }

    /// Set the maximum delay
    #[must_use]
    pub const fn max_wait(mut self, duration: Duration) -> Self {
        self.max_wait = duration;
        self
    }

    /// Set the random stagger percentage (0 disables jitter)
    #[must_use]
    pub const fn jitter_percent(mut self, percent: u8) -> Self {
        self.jitter_percent = percent;
        self
    }

    /// Calculate the un-jittered delay after `failures` consecutive failures
    #[must_use]
    pub fn backoff_for(&self, failures: u32) -> Duration {
        if failures <= self.min_failures {
            return self.min_wait;
        }

        let shift = failures - self.min_failures - 1;
        let wait = if shift < 31 {
            Duration::from_secs(1u64 << shift)
        } else {
            self.max_wait
        };

        wait.min(self.max_wait).max(self.min_wait)
    }
}
