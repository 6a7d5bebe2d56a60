//! Pre-flight checks on the execution context.

use argus_config::SandboxLimits;
use argus_plugins::ExecutionContext;
use argus_plugins::path::normalize_lexically;

use crate::error::SandboxError;

/// Checks that the project path is present and, when a working root is
/// configured, lexically contained in it.
///
/// Relative project paths are interpreted against the working root. The check
/// does not touch the filesystem, so symlinks are not followed.
///
/// # Errors
///
/// Returns [`SandboxError::EmptyProjectPath`] or
/// [`SandboxError::OutsideWorkingRoot`].
pub fn validate_context(
    context: &ExecutionContext,
    limits: &SandboxLimits,
) -> Result<(), SandboxError> {
    let path = context.project_path();
    if path.as_str().trim().is_empty() {
        return Err(SandboxError::EmptyProjectPath);
    }
    let Some(root) = limits.working_root() else {
        return Ok(());
    };

    let normalised_root = normalize_lexically(root);
    let normalised_path = normalize_lexically(&normalised_root.join(path));
    if normalised_path.starts_with(&normalised_root) {
        Ok(())
    } else {
        Err(SandboxError::OutsideWorkingRoot {
            path: normalised_path,
            root: normalised_root,
        })
    }
}
