//! Configuration-time failures of the analysis engine.
//!
//! Execution-time failures never surface here: they are recorded per plugin
//! as error-status results and the run completes. An [`EngineError`] means
//! the run was refused before any plugin started, or a registry operation
//! was rejected.

use argus_config::ConfigError;
use argus_plugins::{DependencyError, RegistrationError};
use thiserror::Error;

/// Errors returned by [`crate::AnalysisEngine`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The requested plugin set names plugins that are not registered.
    #[error("unknown plugins requested: {}", .names.join(", "))]
    UnknownPlugins {
        /// Names that did not match a registered plugin.
        names: Vec<String>,
    },

    /// The dependency subgraph of the requested plugins is invalid.
    #[error("invalid plugin dependency graph: {}", render(.errors))]
    InvalidDependencies {
        /// Every problem found while validating the subgraph.
        errors: Vec<DependencyError>,
    },

    /// The validated subgraph could still not be scheduled.
    #[error(transparent)]
    Planning(#[from] DependencyError),

    /// Registering or unregistering a plugin failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The orchestrator configuration is out of range.
    #[error("invalid orchestrator configuration: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Returns `true` when the error rejected a run rather than a registry
    /// operation.
    #[must_use]
    pub const fn is_run_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownPlugins { .. } | Self::InvalidDependencies { .. } | Self::Planning(_)
        )
    }
}

fn render(errors: &[DependencyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests;
