//! Validation errors for orchestrator configuration.

use thiserror::Error;

/// Errors raised when a configuration value is out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A duration or size field that must be positive was zero.
    #[error("configuration field '{field}' must be greater than zero")]
    ZeroValue {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The log filter expression was empty.
    #[error("log filter must not be empty")]
    EmptyLogFilter,
}
