//! Results of a single sandboxed execution.

use argus_plugins::{PluginMetrics, RawToolResult};

use crate::error::FailureKind;

/// Per-plugin execution counters kept by the sandbox.
pub type ExecutionStats = PluginMetrics;

/// What happened when the sandbox ran a plugin.
///
/// Both variants carry a [`RawToolResult`]; failures carry a synthesised
/// error-status result describing the cause.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The plugin returned a valid result.
    Completed(RawToolResult),
    /// The execution failed and was converted into an error result.
    Failed {
        /// Classification of the failure.
        kind: FailureKind,
        /// Synthesised error result.
        result: RawToolResult,
    },
}

impl ExecutionOutcome {
    /// The result, whether produced by the plugin or synthesised.
    #[must_use]
    pub const fn result(&self) -> &RawToolResult {
        match self {
            Self::Completed(result) | Self::Failed { result, .. } => result,
        }
    }

    /// Consumes the outcome, returning its result.
    #[must_use]
    pub fn into_result(self) -> RawToolResult {
        match self {
            Self::Completed(result) | Self::Failed { result, .. } => result,
        }
    }

    /// The failure classification, if the execution failed.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Returns `true` when the plugin completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Returns `true` when the failure is eligible for retry.
    #[must_use]
    pub fn is_transient_failure(&self) -> bool {
        self.failure_kind().is_some_and(FailureKind::is_transient)
    }

    pub(crate) fn failed(kind: FailureKind, plugin: &str, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            result: RawToolResult::failure(plugin, message),
        }
    }

    pub(crate) const fn result_mut(&mut self) -> &mut RawToolResult {
        match self {
            Self::Completed(result) | Self::Failed { result, .. } => result,
        }
    }
}
