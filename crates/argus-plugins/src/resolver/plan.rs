//! Ordered parallel groups produced by the resolver.

use serde::{Deserialize, Serialize};

/// Ordered list of groups; every member of a group depends only on plugins in
/// strictly earlier groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionPlan {
    groups: Vec<Vec<String>>,
}

impl ExecutionPlan {
    pub(crate) const fn new(groups: Vec<Vec<String>>) -> Self {
        Self { groups }
    }

    /// The groups in execution order.
    #[must_use]
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Number of groups.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` when the plan schedules nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of scheduled plugins.
    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// All plugin names in execution order.
    #[must_use]
    pub fn flatten(&self) -> Vec<String> {
        self.groups.iter().flatten().cloned().collect()
    }

    /// Index of the group containing `name`.
    #[must_use]
    pub fn group_of(&self, name: &str) -> Option<usize> {
        self.groups
            .iter()
            .position(|group| group.iter().any(|member| member == name))
    }

    /// Returns `true` when `name` is scheduled.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.group_of(name).is_some()
    }
}
