//! Historical source retry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::historical::FetchPolicy;

/// Timeout and retry settings for historical calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Per-attempt deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the first attempt.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// First retry delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Maximum retry delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_limit: default_retry_limit(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl HistoryConfig {
    /// Fetch policy with the default multiplier and jitter.
    #[must_use]
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            retry_limit: self.retry_limit,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            ..FetchPolicy::default()
        }
    }
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_retry_limit() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    200
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}
