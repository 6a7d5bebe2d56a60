//! Domain errors raised by registry, resolver, cache, and plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. They are `Clone` so they can be
//! recorded in reports and replayed to several observers.

use thiserror::Error;

/// Errors raised while registering or unregistering plugins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A plugin with the same name is already registered.
    #[error("plugin '{name}' is already registered")]
    Duplicate {
        /// Name that collided.
        name: String,
    },

    /// The descriptor failed structural validation.
    #[error("invalid plugin descriptor: {message}")]
    InvalidDescriptor {
        /// Description of the validation failure.
        message: String,
    },

    /// The named plugin is not registered.
    #[error("plugin '{name}' is not registered")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The plugin rejected the configuration it was offered.
    #[error("plugin '{name}' rejected its configuration: {}", .issues.join("; "))]
    InvalidConfiguration {
        /// Plugin name.
        name: String,
        /// Problems reported by the plugin.
        issues: Vec<String>,
    },

    /// The plugin's initialisation hook failed.
    #[error("plugin '{name}' failed to initialise: {message}")]
    Initialization {
        /// Plugin name.
        name: String,
        /// Failure reported by the plugin.
        message: String,
    },
}

/// Errors raised while validating or planning the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// A declared dependency is not registered at all.
    #[error("plugin '{plugin}' depends on '{dependency}', which is not registered")]
    Missing {
        /// Plugin declaring the dependency.
        plugin: String,
        /// Name of the absent dependency.
        dependency: String,
    },

    /// A declared dependency is registered but outside the requested set.
    #[error(
        "plugin '{plugin}' depends on '{dependency}', which is not part of the requested plugin set"
    )]
    Excluded {
        /// Plugin declaring the dependency.
        plugin: String,
        /// Name of the excluded dependency.
        dependency: String,
    },

    /// A plugin lists itself as a dependency.
    #[error("plugin '{plugin}' depends on itself")]
    SelfDependency {
        /// Offending plugin.
        plugin: String,
    },

    /// A dependency cycle was found.
    #[error("circular dependency detected: {}", .path.join(" -> "))]
    Cycle {
        /// The cycle, starting and ending with the same plugin.
        path: Vec<String>,
    },

    /// Plan computation stalled with plugins left unscheduled.
    #[error("unable to schedule plugins (residual cycle): {}", .plugins.join(", "))]
    Unschedulable {
        /// Plugins that could not be placed in any group.
        plugins: Vec<String>,
    },

    /// A diagnostic query named a plugin outside the graph.
    #[error("plugin '{name}' is not part of the dependency graph")]
    UnknownPlugin {
        /// Name that was queried.
        name: String,
    },
}

impl DependencyError {
    /// Renders the cycle as `A -> B -> A` when this error is a cycle.
    #[must_use]
    pub fn cycle_path(&self) -> Option<String> {
        match self {
            Self::Cycle { path } => Some(path.join(" -> ")),
            _ => None,
        }
    }
}

/// Errors raised by cache writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Keys must contain at least one character.
    #[error("cache key must not be empty")]
    EmptyKey,

    /// The key exceeded the configured length ceiling.
    #[error("cache key of {len} characters exceeds the limit of {max}")]
    KeyTooLong {
        /// Length of the rejected key.
        len: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// The value exceeded the configured size ceiling.
    #[error("cache value of {size} bytes exceeds the limit of {max} bytes")]
    ValueTooLarge {
        /// Size of the rejected value.
        size: usize,
        /// Configured ceiling.
        max: usize,
    },
}

/// Structural problems found in a plugin result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResultShapeError {
    /// The result did not name the tool that produced it.
    #[error("result is missing a tool name")]
    MissingToolName,

    /// A numeric field was negative.
    #[error("field '{field}' must not be negative (got {value})")]
    Negative {
        /// Field name.
        field: String,
        /// Offending value.
        value: f64,
    },

    /// A numeric field was NaN or infinite.
    #[error("field '{field}' must be a finite number")]
    NotFinite {
        /// Field name.
        field: String,
    },

    /// An issue carried no message.
    #[error("issue #{index} has an empty message")]
    EmptyIssueMessage {
        /// Position of the issue in the result.
        index: usize,
    },
}

/// Failure reported by a plugin's own logic.
///
/// Plugins return this from their lifecycle hooks instead of panicking. The
/// sandbox converts it into an error-status result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PluginFailure {
    message: String,
}

impl PluginFailure {
    /// Creates a failure with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wraps any error, keeping its display text.
    #[must_use]
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        Self::new(error.to_string())
    }

    /// Returns the failure message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}
