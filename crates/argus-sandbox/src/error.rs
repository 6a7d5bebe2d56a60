//! Domain errors and failure classification for sandboxed execution.

use camino::Utf8PathBuf;
use strum::Display;
use thiserror::Error;

/// Reasons an execution context is rejected before the plugin runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxError {
    /// The context carries no project path.
    #[error("execution context has an empty project path")]
    EmptyProjectPath,

    /// The project path escapes the configured working root.
    #[error("project path {path} is outside the working root {root}")]
    OutsideWorkingRoot {
        /// Normalised project path.
        path: Utf8PathBuf,
        /// Configured working root.
        root: Utf8PathBuf,
    },
}

/// Why a sandboxed execution produced an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Another execution of the same plugin was in flight.
    AlreadyExecuting,
    /// The execution context failed validation.
    InvalidContext,
    /// The plugin reported a failure.
    Execution,
    /// The plugin panicked.
    Panicked,
    /// The plugin exceeded its time bound.
    Timeout,
    /// The plugin breached a resource ceiling.
    ResourceLimit,
    /// The plugin returned a structurally invalid result.
    InvalidResult,
    /// The execution was stopped by a supervisor.
    Stopped,
}

impl FailureKind {
    /// Returns `true` for failures worth retrying.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::ResourceLimit)
    }
}
