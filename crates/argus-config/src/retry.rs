//! Retry policy for transient plugin failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_backoff_multiplier, default_initial_backoff_ms, default_max_backoff_ms,
    default_max_retries,
};

/// Bounded exponential backoff applied to timeouts and resource breaches.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use argus_config::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, 100);
/// assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
/// assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    backoff_multiplier: u32,
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry budget and initial delay.
    #[must_use]
    pub const fn new(max_retries: u32, initial_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(0, 0)
    }

    /// Overrides the backoff multiplier.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Overrides the backoff ceiling.
    #[must_use]
    pub const fn with_max_backoff_ms(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    /// Maximum number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the first retry in milliseconds.
    #[must_use]
    pub const fn initial_backoff_ms(&self) -> u64 {
        self.initial_backoff_ms
    }

    /// Factor applied to the delay after each retry.
    #[must_use]
    pub const fn backoff_multiplier(&self) -> u32 {
        self.backoff_multiplier
    }

    /// Ceiling on any single delay in milliseconds.
    #[must_use]
    pub const fn max_backoff_ms(&self) -> u64 {
        self.max_backoff_ms
    }

    /// Returns the delay to wait before retry number `retry` (1-based).
    ///
    /// Retry `0` has no delay. Arithmetic saturates and the result never
    /// exceeds the configured ceiling.
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let Some(exponent) = retry.checked_sub(1) else {
            return Duration::ZERO;
        };
        let factor = u64::from(self.backoff_multiplier)
            .checked_pow(exponent)
            .unwrap_or(u64::MAX);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}
