//! Tunables for the renewal loop.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options controlling certificate renewal after the initial bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoConfigOptions {
    /// How long before the agent certificate expires to stop waiting for the
    /// cache to renew it and fetch a new one directly (seconds).
    #[serde(default = "default_fallback_leeway")]
    pub fallback_leeway_secs: u64,

    /// Delay between direct fetch attempts once the fallback has kicked in (seconds).
    #[serde(default = "default_fallback_retry")]
    pub fallback_retry_secs: u64,

    /// Capacity of the channel carrying certificate cache updates.
    #[serde(default = "default_update_capacity")]
    pub update_channel_capacity: usize,
}

impl Default for AutoConfigOptions {
    fn default() -> Self {
        Self {
            fallback_leeway_secs: default_fallback_leeway(),
            fallback_retry_secs: default_fallback_retry(),
            update_channel_capacity: default_update_capacity(),
        }
    }
}

impl AutoConfigOptions {
    /// Fallback leeway as a [`Duration`]
    #[must_use]
    pub const fn fallback_leeway(&self) -> Duration {
        Duration::from_secs(self.fallback_leeway_secs)
    }

    /// Fallback retry interval as a [`Duration`]
    #[must_use]
    pub const fn fallback_retry(&self) -> Duration {
        Duration::from_secs(self.fallback_retry_secs)
    }

    /// Zero values fall back to the defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.fallback_leeway_secs == 0 {
            self.fallback_leeway_secs = default_fallback_leeway();
        }
        if self.fallback_retry_secs == 0 {
            self.fallback_retry_secs = default_fallback_retry();
        }
        if self.update_channel_capacity == 0 {
            self.update_channel_capacity = default_update_capacity();
        }
        self
    }
}

// Default value functions for serde.
const fn default_fallback_leeway() -> u64 {
    10
}

const fn default_fallback_retry() -> u64 {
    60
}

const fn default_update_capacity() -> usize {
    10
}
