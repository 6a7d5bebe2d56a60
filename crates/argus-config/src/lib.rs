//! Shared configuration for the argus plugin orchestrator.
//!
//! [`OrchestratorConfig`] gathers the knobs the engine and sandbox consult
//! during a run: the default per-plugin timeout, the retry policy for
//! transient failures, the sandbox resource ceilings, and the telemetry
//! settings. Every field has a default so a partially specified document
//! deserialises cleanly. Reading configuration from disk or the command line
//! is left to the embedding application.

mod defaults;
mod error;
mod limits;
mod logging;
mod retry;

#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_CACHE_KEY_LEN, DEFAULT_MAX_CACHE_VALUE_BYTES,
    DEFAULT_MAX_RETRIES, DEFAULT_MEMORY_CEILING_BYTES, DEFAULT_SAMPLE_INTERVAL_MS,
    DEFAULT_TIMEOUT_MS, default_log_filter_string, default_log_format,
};
pub use error::ConfigError;
pub use limits::SandboxLimits;
pub use logging::{LogFormat, LogFormatParseError};
pub use retry::RetryPolicy;

use defaults::default_timeout_ms;

/// Top-level configuration consumed by the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_timeout_ms")]
    default_timeout_ms: u64,
    #[serde(default)]
    retry: RetryPolicy,
    #[serde(default)]
    sandbox: SandboxLimits,
    #[serde(default = "default_log_filter_string")]
    log_filter: String,
    #[serde(default = "default_log_format")]
    log_format: LogFormat,
    #[serde(default)]
    log_span_timings: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            retry: RetryPolicy::default(),
            sandbox: SandboxLimits::default(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            log_span_timings: false,
        }
    }
}

impl OrchestratorConfig {
    /// Creates a configuration populated with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the default per-plugin timeout.
    #[must_use]
    pub const fn with_default_timeout_ms(mut self, millis: u64) -> Self {
        self.default_timeout_ms = millis;
        self
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the sandbox limits.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: SandboxLimits) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Overrides the log filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Overrides the log output format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Emits an event with busy and idle time whenever an analysis, group
    /// or plugin span closes.
    #[must_use]
    pub const fn with_log_span_timings(mut self, enabled: bool) -> Self {
        self.log_span_timings = enabled;
        self
    }

    /// Default timeout applied when a tool does not override it.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Retry policy for transient failures.
    #[must_use]
    pub const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Sandbox resource ceilings.
    #[must_use]
    pub const fn sandbox(&self) -> &SandboxLimits {
        &self.sandbox
    }

    /// Log filter expression in `EnvFilter` syntax.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Whether span-close timing events are logged.
    #[must_use]
    pub const fn log_span_timings(&self) -> bool {
        self.log_span_timings
    }

    /// Checks that every bound is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroValue`] when a timeout, sampling interval,
    /// cache ceiling, or backoff multiplier is zero, and
    /// [`ConfigError::EmptyLogFilter`] when the filter is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue {
                field: "default_timeout_ms",
            });
        }
        self.sandbox.validate()?;
        if self.retry.backoff_multiplier() == 0 {
            return Err(ConfigError::ZeroValue {
                field: "retry.backoff_multiplier",
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        Ok(())
    }
}
