//! The capability contract every analyzer plugin satisfies.
//!
//! Adapters for concrete tools (linters, type-checkers, formatters, test
//! runners) implement [`Plugin`]. The registry, sandbox, and engine only ever
//! hold `Arc<dyn Plugin>` values; there is no shared base type to inherit
//! from. Optional hooks have default implementations so a minimal adapter
//! only supplies a descriptor and `execute`.

use std::time::Duration;

use async_trait::async_trait;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::ExecutionContext;
use crate::descriptor::PluginDescriptor;
use crate::error::PluginFailure;
use crate::result::RawToolResult;

/// Contract implemented by every analyzer plugin.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use argus_plugins::{
///     ExecutionContext, Plugin, PluginDescriptor, PluginFailure, RawToolResult,
/// };
///
/// struct Formatter {
///     descriptor: PluginDescriptor,
/// }
///
/// #[async_trait]
/// impl Plugin for Formatter {
///     fn descriptor(&self) -> &PluginDescriptor {
///         &self.descriptor
///     }
///
///     async fn execute(
///         &self,
///         _context: &ExecutionContext,
///     ) -> Result<RawToolResult, PluginFailure> {
///         Ok(RawToolResult::success(self.name()))
///     }
/// }
/// ```
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Identity, dependencies, and capability flags.
    fn descriptor(&self) -> &PluginDescriptor;

    /// Unique plugin name.
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    /// Plugin version.
    fn version(&self) -> &str {
        self.descriptor().version()
    }

    /// Names of plugins that must complete first.
    fn dependencies(&self) -> &[String] {
        self.descriptor().dependencies()
    }

    /// Prepares the plugin with its resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginFailure`] when the plugin cannot be prepared.
    async fn initialize(&self, _config: &ToolConfiguration) -> Result<(), PluginFailure> {
        Ok(())
    }

    /// Runs the analysis.
    ///
    /// Long-running implementations should poll
    /// [`ExecutionContext::is_cancelled`] and return early once it is set.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginFailure`] when the analysis cannot complete.
    async fn execute(&self, context: &ExecutionContext) -> Result<RawToolResult, PluginFailure>;

    /// Releases resources when the plugin is unregistered.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginFailure`]; callers log it and carry on.
    async fn cleanup(&self) -> Result<(), PluginFailure> {
        Ok(())
    }

    /// Checks a configuration before it is applied.
    fn validate_config(&self, _config: &ToolConfiguration) -> ConfigValidation {
        ConfigValidation::valid()
    }

    /// Configuration used when the project does not provide one.
    fn default_config(&self) -> ToolConfiguration {
        ToolConfiguration::new(self.name())
    }

    /// Whether the plugin can restrict itself to changed files.
    fn supports_incremental(&self) -> bool {
        self.descriptor().capabilities().supports_incremental()
    }

    /// Whether the plugin can reuse cached results.
    fn supports_cache(&self) -> bool {
        self.descriptor().capabilities().supports_cache()
    }

    /// Whether a change to `path` is relevant to this plugin.
    fn handles_file(&self, path: &Utf8Path) -> bool {
        self.descriptor().handles_file(path)
    }

    /// Plugin-maintained execution metrics.
    fn metrics(&self) -> PluginMetrics {
        PluginMetrics::default()
    }
}

const fn enabled_by_default() -> bool {
    true
}

/// Per-tool configuration supplied by the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfiguration {
    name: String,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
    #[serde(default)]
    options: Map<String, Value>,
}

impl ToolConfiguration {
    /// Creates an enabled configuration with no options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            timeout_ms: None,
            options: Map::new(),
        }
    }

    /// Enables or disables the tool.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Overrides the execution timeout for this tool.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets a tool-specific option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Tool name this configuration applies to.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Whether the tool is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Timeout override, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Looks up a tool-specific option.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// All tool-specific options.
    #[must_use]
    pub const fn options(&self) -> &Map<String, Value> {
        &self.options
    }
}

/// Project-level configuration carried in the execution context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfiguration {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    tools: Vec<ToolConfiguration>,
}

impl ProjectConfiguration {
    /// Creates a configuration for the named project.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: Vec::new(),
        }
    }

    /// Adds a tool configuration.
    #[must_use]
    pub fn with_tool(mut self, tool: ToolConfiguration) -> Self {
        self.tools.push(tool);
        self
    }

    /// Project name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Project version.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// All tool configurations.
    #[must_use]
    pub fn tools(&self) -> &[ToolConfiguration] {
        &self.tools
    }

    /// Looks up the configuration for a tool by name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&ToolConfiguration> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}

/// Outcome of [`Plugin::validate_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValidation {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ConfigValidation {
    /// A validation with no findings.
    #[must_use]
    pub const fn valid() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Records a blocking problem.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    /// Records a non-blocking concern.
    #[must_use]
    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }

    /// Returns `true` when no errors were recorded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Blocking problems.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Non-blocking concerns.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Execution counters for a plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetrics {
    executions: u64,
    failures: u64,
    timeouts: u64,
    resource_breaches: u64,
    total_duration: Duration,
}

impl PluginMetrics {
    /// Records a completed execution.
    pub const fn record_success(&mut self, elapsed: Duration) {
        self.executions = self.executions.saturating_add(1);
        self.total_duration = self.total_duration.saturating_add(elapsed);
    }

    /// Records a failed execution.
    pub const fn record_failure(&mut self, elapsed: Duration) {
        self.record_success(elapsed);
        self.failures = self.failures.saturating_add(1);
    }

    /// Records a failed execution caused by a timeout.
    pub const fn record_timeout(&mut self, elapsed: Duration) {
        self.record_failure(elapsed);
        self.timeouts = self.timeouts.saturating_add(1);
    }

    /// Records a failed execution caused by a resource breach.
    pub const fn record_resource_breach(&mut self, elapsed: Duration) {
        self.record_failure(elapsed);
        self.resource_breaches = self.resource_breaches.saturating_add(1);
    }

    /// Number of executions, successful or not.
    #[must_use]
    pub const fn executions(&self) -> u64 {
        self.executions
    }

    /// Number of failed executions.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    /// Number of executions that timed out.
    #[must_use]
    pub const fn timeouts(&self) -> u64 {
        self.timeouts
    }

    /// Number of executions aborted for breaching a resource ceiling.
    #[must_use]
    pub const fn resource_breaches(&self) -> u64 {
        self.resource_breaches
    }

    /// Total time spent executing.
    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Mean execution time, or zero before the first execution.
    #[must_use]
    pub fn average_duration(&self) -> Duration {
        u32::try_from(self.executions)
            .ok()
            .filter(|count| *count > 0)
            .map_or(Duration::ZERO, |count| self.total_duration / count)
    }
}
