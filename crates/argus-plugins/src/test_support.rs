//! Scriptable plugin double shared by the workspace test suites.
//!
//! Enabled for this crate's own tests and, for downstream crates, through the
//! `test-support` feature.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cache::Cache;
use crate::context::ExecutionContext;
use crate::contract::{ConfigValidation, Plugin, PluginMetrics, ToolConfiguration};
use crate::descriptor::{Capabilities, PluginDescriptor};
use crate::error::PluginFailure;
use crate::result::RawToolResult;

/// What a [`StubPlugin`] does when executed.
#[derive(Debug, Clone)]
pub enum StubBehaviour {
    /// Return an empty successful result.
    Succeed,
    /// Return the given result verbatim.
    Report(RawToolResult),
    /// Return a plugin failure with the given message.
    Fail(String),
    /// Sleep, then succeed.
    Sleep(Duration),
    /// Panic with the given message.
    Panic(String),
    /// Block until the context's cancellation token fires.
    AwaitCancellation,
    /// Write an entry through the context cache, failing if the write is
    /// refused or no cache is present.
    WriteCache {
        /// Cache key.
        key: String,
        /// Payload.
        value: Vec<u8>,
    },
}

/// Ordered record of plugin start and finish events across several stubs.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    /// Snapshot of the recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Position of an entry, if recorded.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|recorded| recorded == entry)
    }
}

/// Plugin double whose behaviour is scripted per execution.
#[derive(Debug)]
pub struct StubPlugin {
    descriptor: PluginDescriptor,
    script: Mutex<VecDeque<StubBehaviour>>,
    fallback: StubBehaviour,
    journal: Option<Journal>,
    config_errors: Vec<String>,
    initialize_failure: Option<String>,
    cleanup_failure: Option<String>,
    executions: AtomicU32,
    initialisations: AtomicU32,
    cleanups: AtomicU32,
    cache_observations: Mutex<Vec<bool>>,
    metrics: Mutex<PluginMetrics>,
}

impl StubPlugin {
    /// Creates a stub that always succeeds.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: PluginDescriptor::new(name, "1.0.0"),
            script: Mutex::new(VecDeque::new()),
            fallback: StubBehaviour::Succeed,
            journal: None,
            config_errors: Vec::new(),
            initialize_failure: None,
            cleanup_failure: None,
            executions: AtomicU32::new(0),
            initialisations: AtomicU32::new(0),
            cleanups: AtomicU32::new(0),
            cache_observations: Mutex::new(Vec::new()),
            metrics: Mutex::new(PluginMetrics::default()),
        }
    }

    /// Declares dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.descriptor = self
            .descriptor
            .with_dependencies(dependencies.iter().copied());
        self
    }

    /// Declares capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.descriptor = self.descriptor.with_capabilities(capabilities);
        self
    }

    /// Restricts the files the plugin considers relevant.
    #[must_use]
    pub fn with_file_extensions(mut self, extensions: &[&str]) -> Self {
        self.descriptor = self
            .descriptor
            .with_file_extensions(extensions.iter().copied());
        self
    }

    /// Behaviour used once the script is exhausted.
    #[must_use]
    pub fn with_behaviour(mut self, behaviour: StubBehaviour) -> Self {
        self.fallback = behaviour;
        self
    }

    /// Behaviours consumed one per execution before the fallback applies.
    #[must_use]
    pub fn with_script(self, script: impl IntoIterator<Item = StubBehaviour>) -> Self {
        self.script.lock().extend(script);
        self
    }

    /// Records start and finish events into a shared journal.
    #[must_use]
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Makes `validate_config` report the given errors.
    #[must_use]
    pub fn with_config_errors(mut self, errors: &[&str]) -> Self {
        self.config_errors = errors.iter().map(|error| (*error).to_owned()).collect();
        self
    }

    /// Makes `initialize` fail.
    #[must_use]
    pub fn with_failing_initialize(mut self, message: &str) -> Self {
        self.initialize_failure = Some(message.to_owned());
        self
    }

    /// Makes `cleanup` fail.
    #[must_use]
    pub fn with_failing_cleanup(mut self, message: &str) -> Self {
        self.cleanup_failure = Some(message.to_owned());
        self
    }

    /// Wraps the stub for registration.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of times `execute` was entered.
    #[must_use]
    pub fn executions(&self) -> u32 {
        self.executions.load(Ordering::SeqCst)
    }

    /// Number of times `initialize` was called.
    #[must_use]
    pub fn initialisations(&self) -> u32 {
        self.initialisations.load(Ordering::SeqCst)
    }

    /// Number of times `cleanup` was called.
    #[must_use]
    pub fn cleanups(&self) -> u32 {
        self.cleanups.load(Ordering::SeqCst)
    }

    /// Whether each execution saw a cache handle, in execution order.
    #[must_use]
    pub fn cache_observations(&self) -> Vec<bool> {
        self.cache_observations.lock().clone()
    }

    fn next_behaviour(&self) -> StubBehaviour {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn record(&self, event: &str) {
        if let Some(journal) = &self.journal {
            journal.push(format!("{event}:{}", self.descriptor.name()));
        }
    }

    async fn perform(
        &self,
        behaviour: StubBehaviour,
        context: &ExecutionContext,
    ) -> Result<RawToolResult, PluginFailure> {
        let name = self.descriptor.name();
        match behaviour {
            StubBehaviour::Succeed => Ok(RawToolResult::success(name)),
            StubBehaviour::Report(result) => Ok(result),
            StubBehaviour::Fail(message) => Err(PluginFailure::new(message)),
            StubBehaviour::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(RawToolResult::success(name))
            }
            StubBehaviour::Panic(message) => explode(&message),
            StubBehaviour::AwaitCancellation => {
                context.cancellation().cancelled().await;
                Err(PluginFailure::new("cancelled"))
            }
            StubBehaviour::WriteCache { key, value } => {
                let cache = context
                    .cache()
                    .ok_or_else(|| PluginFailure::new("no cache available"))?;
                cache
                    .set(&key, value)
                    .map_err(|error| PluginFailure::from_error(&error))?;
                Ok(RawToolResult::success(name))
            }
        }
    }
}

fn explode(message: &str) -> ! {
    panic!("{message}")
}

#[async_trait]
impl Plugin for StubPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    async fn initialize(&self, _config: &ToolConfiguration) -> Result<(), PluginFailure> {
        self.initialisations.fetch_add(1, Ordering::SeqCst);
        self.initialize_failure
            .as_ref()
            .map_or(Ok(()), |message| Err(PluginFailure::new(message.as_str())))
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<RawToolResult, PluginFailure> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.cache_observations.lock().push(context.cache().is_some());
        self.record("start");
        let started = Instant::now();
        let outcome = self.perform(self.next_behaviour(), context).await;
        let mut metrics = self.metrics.lock();
        match &outcome {
            Ok(_) => metrics.record_success(started.elapsed()),
            Err(_) => metrics.record_failure(started.elapsed()),
        }
        drop(metrics);
        self.record("finish");
        outcome
    }

    async fn cleanup(&self) -> Result<(), PluginFailure> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        self.cleanup_failure
            .as_ref()
            .map_or(Ok(()), |message| Err(PluginFailure::new(message.as_str())))
    }

    fn metrics(&self) -> PluginMetrics {
        *self.metrics.lock()
    }

    fn validate_config(&self, _config: &ToolConfiguration) -> ConfigValidation {
        self.config_errors
            .iter()
            .fold(ConfigValidation::valid(), |validation, error| {
                validation.with_error(error.as_str())
            })
    }
}

/// Convenience for tests that only need a cache handle.
#[must_use]
pub fn memory_cache() -> Arc<dyn Cache> {
    Arc::new(crate::cache::MemoryCache::new())
}
