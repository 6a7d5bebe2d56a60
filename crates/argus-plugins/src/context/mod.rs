//! Execution context handed to each plugin.
//!
//! The caller supplies a fresh [`ExecutionContext`] per run. It carries the
//! project location, the optional changed-file set that drives incremental
//! mode, the project configuration, a structured [`Logger`], an optional
//! [`Cache`], and a cancellation token the plugin should poll
//! cooperatively. Every handle is reference counted so the context can be
//! cloned cheaply into concurrent tasks.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::Cache;
use crate::contract::ProjectConfiguration;

/// Tracing target for messages logged by plugins.
const PLUGIN_LOG_TARGET: &str = "argus_plugins::plugin";

/// Severity of a plugin log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Routine progress.
    Info,
    /// Something unexpected but recoverable.
    Warn,
    /// A failure.
    Error,
}

/// Structured logger handle exposed to plugins.
pub trait Logger: Send + Sync {
    /// Records a message at the given level.
    fn log(&self, level: LogLevel, message: &str);

    /// Records an error.
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Records a warning.
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Records routine progress.
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Records diagnostic detail.
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
}

/// Logger that forwards every message to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => debug!(target: PLUGIN_LOG_TARGET, "{message}"),
            LogLevel::Info => info!(target: PLUGIN_LOG_TARGET, "{message}"),
            LogLevel::Warn => warn!(target: PLUGIN_LOG_TARGET, "{message}"),
            LogLevel::Error => error!(target: PLUGIN_LOG_TARGET, "{message}"),
        }
    }
}

/// Everything a plugin may consult while executing.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use argus_plugins::{ExecutionContext, MemoryCache};
///
/// let context = ExecutionContext::new("/srv/project")
///     .with_changed_files(["src/main.rs"])
///     .with_cache(Arc::new(MemoryCache::new()));
///
/// assert_eq!(context.project_path().as_str(), "/srv/project");
/// assert_eq!(context.changed_files().map(<[_]>::len), Some(1));
/// assert!(context.cache().is_some());
/// ```
#[derive(Clone)]
pub struct ExecutionContext {
    project_path: Utf8PathBuf,
    changed_files: Option<Vec<Utf8PathBuf>>,
    config: Arc<ProjectConfiguration>,
    logger: Arc<dyn Logger>,
    cache: Option<Arc<dyn Cache>>,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    /// Creates a context for the given project with a tracing logger and no
    /// cache.
    #[must_use]
    pub fn new(project_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            changed_files: None,
            config: Arc::new(ProjectConfiguration::default()),
            logger: Arc::new(TracingLogger),
            cache: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Restricts the run to the given changed files.
    #[must_use]
    pub fn with_changed_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.changed_files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Attaches the project configuration.
    #[must_use]
    pub fn with_config(mut self, config: ProjectConfiguration) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Replaces the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Attaches a cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Removes any attached cache.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Root of the project under analysis.
    #[must_use]
    pub fn project_path(&self) -> &Utf8Path {
        &self.project_path
    }

    /// Changed files, when running incrementally.
    #[must_use]
    pub fn changed_files(&self) -> Option<&[Utf8PathBuf]> {
        self.changed_files.as_deref()
    }

    /// Project configuration.
    #[must_use]
    pub fn config(&self) -> &ProjectConfiguration {
        &self.config
    }

    /// Logger handle.
    #[must_use]
    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Shared logger handle, for wrapping.
    #[must_use]
    pub fn logger_handle(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.logger)
    }

    /// Cache handle, if caching is enabled for this run.
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.cache.as_ref()
    }

    /// Token signalled when the plugin should stop work.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Convenience for `self.cancellation().is_cancelled()`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("project_path", &self.project_path)
            .field("changed_files", &self.changed_files)
            .field("config", &self.config)
            .field("cache", &self.cache.is_some())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}
