//! Pre-registration compatibility checks.
//!
//! Duplicate names are always reported. Anything richer (API overlap, version
//! ranges) is delegated to a [`CompatibilityPolicy`]; the default policy
//! reports nothing.

use crate::descriptor::PluginDescriptor;
use crate::registry::PluginRegistry;

/// Hook for conflict detection between a candidate and registered plugins.
pub trait CompatibilityPolicy: Send + Sync {
    /// Returns a description of every conflict between `candidate` and the
    /// plugins already in `registry`.
    fn conflicts(&self, candidate: &PluginDescriptor, registry: &PluginRegistry) -> Vec<String>;
}

/// Policy that accepts every candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveCompatibility;

impl CompatibilityPolicy for PermissiveCompatibility {
    fn conflicts(&self, _candidate: &PluginDescriptor, _registry: &PluginRegistry) -> Vec<String> {
        Vec::new()
    }
}

/// Outcome of a compatibility check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatibilityReport {
    conflicts: Vec<String>,
}

impl CompatibilityReport {
    pub(crate) const fn new(conflicts: Vec<String>) -> Self {
        Self { conflicts }
    }

    /// Returns `true` when no conflicts were found.
    #[must_use]
    pub const fn is_compatible(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Conflict descriptions.
    #[must_use]
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }
}
