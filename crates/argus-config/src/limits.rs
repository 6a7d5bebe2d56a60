//! Resource ceilings enforced by the sandbox.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::defaults::{
    default_max_cache_key_len, default_max_cache_value_bytes, default_memory_ceiling_bytes,
    default_sample_interval_ms,
};

/// Bounds applied to every sandboxed plugin execution.
///
/// The working root, when present, is the directory every project path
/// handed to a plugin must live under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxLimits {
    #[serde(default = "default_memory_ceiling_bytes")]
    memory_ceiling_bytes: u64,
    #[serde(default = "default_sample_interval_ms")]
    sample_interval_ms: u64,
    #[serde(default = "default_max_cache_key_len")]
    max_cache_key_len: usize,
    #[serde(default = "default_max_cache_value_bytes")]
    max_cache_value_bytes: usize,
    #[serde(default)]
    working_root: Option<Utf8PathBuf>,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            memory_ceiling_bytes: default_memory_ceiling_bytes(),
            sample_interval_ms: default_sample_interval_ms(),
            max_cache_key_len: default_max_cache_key_len(),
            max_cache_value_bytes: default_max_cache_value_bytes(),
            working_root: None,
        }
    }
}

impl SandboxLimits {
    /// Creates limits populated with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the memory ceiling.
    #[must_use]
    pub const fn with_memory_ceiling_bytes(mut self, bytes: u64) -> Self {
        self.memory_ceiling_bytes = bytes;
        self
    }

    /// Overrides the resource sampling interval.
    #[must_use]
    pub const fn with_sample_interval_ms(mut self, millis: u64) -> Self {
        self.sample_interval_ms = millis;
        self
    }

    /// Overrides the cache key length ceiling.
    #[must_use]
    pub const fn with_max_cache_key_len(mut self, len: usize) -> Self {
        self.max_cache_key_len = len;
        self
    }

    /// Overrides the cache value size ceiling.
    #[must_use]
    pub const fn with_max_cache_value_bytes(mut self, bytes: usize) -> Self {
        self.max_cache_value_bytes = bytes;
        self
    }

    /// Declares the directory project paths must be contained in.
    #[must_use]
    pub fn with_working_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.working_root = Some(root.into());
        self
    }

    /// Memory ceiling in bytes.
    #[must_use]
    pub const fn memory_ceiling_bytes(&self) -> u64 {
        self.memory_ceiling_bytes
    }

    /// Interval between resource samples, never shorter than one
    /// millisecond.
    #[must_use]
    pub const fn sample_interval(&self) -> Duration {
        if self.sample_interval_ms == 0 {
            Duration::from_millis(1)
        } else {
            Duration::from_millis(self.sample_interval_ms)
        }
    }

    /// Raw sampling interval in milliseconds.
    #[must_use]
    pub const fn sample_interval_ms(&self) -> u64 {
        self.sample_interval_ms
    }

    /// Longest permitted cache key.
    #[must_use]
    pub const fn max_cache_key_len(&self) -> usize {
        self.max_cache_key_len
    }

    /// Largest permitted cache value in bytes.
    #[must_use]
    pub const fn max_cache_value_bytes(&self) -> usize {
        self.max_cache_value_bytes
    }

    /// Declared working root, if any.
    #[must_use]
    pub fn working_root(&self) -> Option<&Utf8Path> {
        self.working_root.as_deref()
    }

    /// Checks that every ceiling is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroValue`] naming the first zero field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero_checks = [
            ("sandbox.sample_interval_ms", self.sample_interval_ms == 0),
            ("sandbox.memory_ceiling_bytes", self.memory_ceiling_bytes == 0),
            ("sandbox.max_cache_key_len", self.max_cache_key_len == 0),
            (
                "sandbox.max_cache_value_bytes",
                self.max_cache_value_bytes == 0,
            ),
        ];
        match zero_checks.into_iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(ConfigError::ZeroValue { field }),
            None => Ok(()),
        }
    }
}
