//! Whole-project orchestration over the plugin registry.
//!
//! The [`AnalysisEngine`] owns the registry, the sandbox and the normaliser.
//! A run validates the requested subgraph, executes its parallel groups in
//! barrier order, retries transient failures, and normalises one result per
//! requested plugin. Registry mutation waits for in-flight runs to finish.

mod options;
mod report;
mod run;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use argus_config::OrchestratorConfig;
use argus_plugins::{
    DependencyResolver, ExecutionContext, ExecutionPlan, Plugin, PluginMetrics, PluginRegistry,
    ProjectConfiguration, RawToolResult, RegistrationError, ToolConfiguration,
};
use argus_sandbox::Sandbox;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::EngineError;
use crate::normalizer::{NormalizedResult, ResultNormalizer};

pub use self::options::AnalysisOptions;
pub use self::report::{AnalysisResult, AnalysisSummary, overall_score};
pub use self::run::{RETRIES_METRIC, SKIPPED_METRIC};

use self::run::PluginJob;

const ORCHESTRATOR_TARGET: &str = "argus_engine::orchestrator";

/// Coordinates registration and execution of analyzer plugins.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use argus_config::OrchestratorConfig;
/// use argus_engine::{AnalysisEngine, AnalysisOptions};
/// use argus_plugins::ExecutionContext;
///
/// # async fn demo(plugin: Arc<dyn argus_plugins::Plugin>) -> Result<(), argus_engine::EngineError> {
/// let engine = AnalysisEngine::new(OrchestratorConfig::default())?;
/// engine.register_plugin(plugin, None).await?;
///
/// let context = ExecutionContext::new("/srv/project");
/// let result = engine
///     .execute_analysis("web-app", &context, &AnalysisOptions::new())
///     .await?;
/// println!("score: {}", result.overall_score());
/// # Ok(())
/// # }
/// ```
pub struct AnalysisEngine {
    registry: RwLock<PluginRegistry>,
    sandbox: Arc<Sandbox>,
    normalizer: ResultNormalizer,
    config: OrchestratorConfig,
}

impl AnalysisEngine {
    /// Creates an engine whose sandbox samples this process's memory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when `config` fails validation.
    pub fn new(config: OrchestratorConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let sandbox = Arc::new(Sandbox::with_process_monitor(config.sandbox().clone()));
        Self::with_sandbox(config, sandbox)
    }

    /// Creates an engine around an existing sandbox.
    ///
    /// The sandbox's own limits apply to execution; the sandbox section of
    /// `config` is only validated.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when `config` or the sandbox's limits
    /// fail validation.
    pub fn with_sandbox(
        config: OrchestratorConfig,
        sandbox: Arc<Sandbox>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        sandbox.limits().validate()?;
        Ok(Self {
            registry: RwLock::new(PluginRegistry::new()),
            sandbox,
            normalizer: ResultNormalizer::new(),
            config,
        })
    }

    /// Replaces the result normaliser.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: ResultNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Sandbox used for every plugin execution.
    #[must_use]
    pub const fn sandbox(&self) -> &Arc<Sandbox> {
        &self.sandbox
    }

    /// Normaliser applied to raw results.
    #[must_use]
    pub const fn normalizer(&self) -> &ResultNormalizer {
        &self.normalizer
    }

    /// Validates, initialises and registers `plugin`.
    ///
    /// The plugin is configured with its entry in `project` when one exists,
    /// otherwise with its own default configuration. Waits for in-flight
    /// runs to finish before mutating the registry.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Registration`] when the name is taken, the
    /// descriptor is invalid, the plugin rejects its configuration, or
    /// initialisation fails. A rejected plugin is not registered.
    pub async fn register_plugin(
        &self,
        plugin: Arc<dyn Plugin>,
        project: Option<&ProjectConfiguration>,
    ) -> Result<(), EngineError> {
        let mut registry = self.registry.write().await;
        let name = plugin.name().to_owned();
        if registry.contains(&name) {
            return Err(RegistrationError::Duplicate { name }.into());
        }
        plugin.descriptor().validate()?;

        let tool_config = project
            .and_then(|configuration| configuration.tool(&name))
            .cloned()
            .unwrap_or_else(|| plugin.default_config());
        let validation = plugin.validate_config(&tool_config);
        for warning in validation.warnings() {
            warn!(
                target: ORCHESTRATOR_TARGET,
                plugin = %name,
                warning = %warning,
                "plugin configuration warning"
            );
        }
        if !validation.is_valid() {
            return Err(RegistrationError::InvalidConfiguration {
                name,
                issues: validation.errors().to_vec(),
            }
            .into());
        }

        plugin.initialize(&tool_config).await.map_err(|failure| {
            RegistrationError::Initialization {
                name: name.clone(),
                message: failure.message().to_owned(),
            }
        })?;
        registry.register(plugin)?;
        info!(
            target: ORCHESTRATOR_TARGET,
            plugin = %name,
            plugins = registry.count(),
            "registered plugin"
        );
        Ok(())
    }

    /// Cleans up and removes the named plugin.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Registration`] when no such plugin exists.
    pub async fn unregister_plugin(&self, name: &str) -> Result<Arc<dyn Plugin>, EngineError> {
        let mut registry = self.registry.write().await;
        Ok(registry.unregister(name).await?)
    }

    /// Unregisters every plugin in reverse registration order.
    ///
    /// Cleanup failures are logged by the registry and do not stop the
    /// shutdown. Returns the number of plugins removed.
    pub async fn shutdown(&self) -> usize {
        let mut registry = self.registry.write().await;
        let names: Vec<String> = registry.names().iter().rev().cloned().collect();
        let mut removed = 0_usize;
        for name in names {
            match registry.unregister(&name).await {
                Ok(_) => removed = removed.saturating_add(1),
                Err(error) => warn!(
                    target: ORCHESTRATOR_TARGET,
                    plugin = %name,
                    %error,
                    "failed to unregister plugin during shutdown"
                ),
            }
        }
        info!(target: ORCHESTRATOR_TARGET, removed, "engine shut down");
        removed
    }

    /// Metrics the named plugin maintains about itself.
    ///
    /// Counters measured from outside the plugin are available from
    /// [`Sandbox::stats`].
    pub async fn plugin_metrics(&self, name: &str) -> Option<PluginMetrics> {
        self.registry
            .read()
            .await
            .plugin(name)
            .map(|plugin| plugin.metrics())
    }

    /// Names of registered plugins in registration order.
    pub async fn plugin_names(&self) -> Vec<String> {
        self.registry.read().await.names().to_vec()
    }

    /// Computes the plan a run with `options` would follow without executing
    /// anything.
    ///
    /// # Errors
    ///
    /// Fails exactly as [`AnalysisEngine::execute_analysis`] would before
    /// starting any plugin.
    pub async fn plan(
        &self,
        context: &ExecutionContext,
        options: &AnalysisOptions,
    ) -> Result<ExecutionPlan, EngineError> {
        let registry = self.registry.read().await;
        plan_for(&registry, context.config(), options)
    }

    /// Runs the requested plugins against `context`.
    ///
    /// Unknown plugin names and invalid dependency subgraphs fail the call
    /// before any plugin runs. Otherwise the run always completes: every
    /// requested plugin contributes exactly one normalised result, in plan
    /// order, whatever happened while it executed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownPlugins`],
    /// [`EngineError::InvalidDependencies`] or [`EngineError::Planning`].
    pub async fn execute_analysis(
        &self,
        project_id: &str,
        context: &ExecutionContext,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, EngineError> {
        let started = Instant::now();
        let registry = self.registry.read().await;
        let plan = plan_for(&registry, context.config(), options)?;
        let run_span = info_span!(target: ORCHESTRATOR_TARGET, "analysis", project = project_id);
        let tool_results = self
            .run_groups(&registry, &plan, context, options)
            .instrument(run_span)
            .await;

        let analysis = AnalysisResult::new(project_id, tool_results, plan, started.elapsed());
        info!(
            target: ORCHESTRATOR_TARGET,
            project = project_id,
            issues = analysis.summary().total_issues(),
            errors = analysis.summary().total_errors(),
            score = analysis.overall_score(),
            elapsed_ms = u64::try_from(analysis.duration().as_millis()).unwrap_or(u64::MAX),
            "analysis finished"
        );
        Ok(analysis)
    }

    /// Executes `plan` group by group and normalises the results in plan
    /// order.
    async fn run_groups(
        &self,
        registry: &PluginRegistry,
        plan: &ExecutionPlan,
        context: &ExecutionContext,
        options: &AnalysisOptions,
    ) -> Vec<NormalizedResult> {
        info!(
            target: ORCHESTRATOR_TARGET,
            plugins = plan.plugin_count(),
            groups = plan.len(),
            incremental = options.is_incremental(),
            cache = options.is_cache_enabled(),
            "starting analysis"
        );

        let mut raw: HashMap<String, RawToolResult> = HashMap::with_capacity(plan.plugin_count());
        for (index, group) in plan.groups().iter().enumerate() {
            debug!(
                target: ORCHESTRATOR_TARGET,
                group = index,
                members = ?group,
                "launching group"
            );
            let group_span = info_span!(target: ORCHESTRATOR_TARGET, "group", group = index);
            let mut tasks = JoinSet::new();
            for name in group {
                if let Some(plugin) = registry.plugin(name) {
                    tasks.spawn(
                        self.job(Arc::clone(plugin), context, options)
                            .run()
                            .instrument(group_span.clone()),
                    );
                }
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((name, result)) => {
                        raw.insert(name, result);
                    }
                    Err(error) => warn!(
                        target: ORCHESTRATOR_TARGET,
                        group = index,
                        %error,
                        "plugin task ended abnormally"
                    ),
                }
            }
            for name in group {
                raw.entry(name.clone()).or_insert_with(|| {
                    RawToolResult::failure(
                        name.as_str(),
                        format!("plugin '{name}' ended without producing a result"),
                    )
                });
            }
        }

        plan.flatten()
            .into_iter()
            .filter_map(|name| raw.remove(&name))
            .map(|result| self.normalizer.normalize_result(&result))
            .collect()
    }

    fn job(
        &self,
        plugin: Arc<dyn Plugin>,
        context: &ExecutionContext,
        options: &AnalysisOptions,
    ) -> PluginJob {
        let timeout = context
            .config()
            .tool(plugin.name())
            .and_then(ToolConfiguration::timeout)
            .unwrap_or_else(|| self.config.default_timeout());
        PluginJob {
            plugin,
            sandbox: Arc::clone(&self.sandbox),
            context: context.clone(),
            timeout,
            retry: *self.config.retry(),
            incremental: options.is_incremental(),
            cache: options.is_cache_enabled(),
        }
    }
}

impl fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("sandbox", &self.sandbox)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Selects, validates and schedules the plugins a run covers.
fn plan_for(
    registry: &PluginRegistry,
    project: &ProjectConfiguration,
    options: &AnalysisOptions,
) -> Result<ExecutionPlan, EngineError> {
    let requested = requested_plugins(registry, project, options)?;
    let resolver = DependencyResolver::scoped(registry, &requested);
    let validation = resolver.validate();
    for warning in validation.warnings() {
        debug!(target: ORCHESTRATOR_TARGET, %warning, "dependency graph warning");
    }
    if !validation.is_valid() {
        return Err(EngineError::InvalidDependencies {
            errors: validation.into_errors(),
        });
    }
    Ok(resolver.parallel_groups()?)
}

/// Explicitly requested names, deduplicated in request order, or every
/// registered plugin whose tool configuration is not disabled.
fn requested_plugins(
    registry: &PluginRegistry,
    project: &ProjectConfiguration,
    options: &AnalysisOptions,
) -> Result<Vec<String>, EngineError> {
    let Some(names) = options.plugins() else {
        return Ok(registry
            .names()
            .iter()
            .filter(|name| project.tool(name).is_none_or(|tool| tool.is_enabled()))
            .cloned()
            .collect());
    };

    let mut seen = HashSet::new();
    let requested: Vec<String> = names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect();
    let unknown: Vec<String> = requested
        .iter()
        .filter(|name| !registry.contains(name))
        .cloned()
        .collect();
    if unknown.is_empty() {
        Ok(requested)
    } else {
        Err(EngineError::UnknownPlugins { names: unknown })
    }
}
