//! Retry policy with exponential backoff

use crate::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default cap on the retry delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// When and how long to wait before retrying a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    #[serde(with = "crate::config::duration_serde")]
    pub base_delay: Duration,
    /// Upper bound on a single delay
    #[serde(with = "crate::config::duration_serde")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether to retry after `error`, given the retries already made.
    ///
    /// Only network and server errors are retried; 4xx never is.
    pub fn should_retry(&self, error: &DashboardError, retries: u32) -> bool {
        error.is_recoverable() && retries < self.max_retries
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
