//! Per-run options.

use serde::{Deserialize, Serialize};

/// Options controlling a single [`crate::AnalysisEngine::execute_analysis`]
/// call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plugins: Option<Vec<String>>,
    #[serde(default)]
    incremental: bool,
    #[serde(default)]
    enable_cache: bool,
}

impl AnalysisOptions {
    /// Runs every enabled registered plugin, without incremental skipping or
    /// caching.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the run to the named plugins.
    #[must_use]
    pub fn with_plugins<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins = Some(plugins.into_iter().map(Into::into).collect());
        self
    }

    /// Skips incremental-capable plugins when no changed file concerns them.
    #[must_use]
    pub const fn incremental(mut self, enabled: bool) -> Self {
        self.incremental = enabled;
        self
    }

    /// Passes the context cache to plugins that support caching.
    #[must_use]
    pub const fn enable_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    /// Explicitly requested plugins, if any.
    #[must_use]
    pub fn plugins(&self) -> Option<&[String]> {
        self.plugins.as_deref()
    }

    /// Whether incremental skipping is enabled.
    #[must_use]
    pub const fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Whether caching is enabled.
    #[must_use]
    pub const fn is_cache_enabled(&self) -> bool {
        self.enable_cache
    }
}
