//! Bounded, single-flight execution of one plugin.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use argus_config::SandboxLimits;
use argus_plugins::{ExecutionContext, Logger, Plugin, PluginFailure, RawToolResult};
use parking_lot::Mutex;
use tokio::task::JoinError;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::error::FailureKind;
use crate::monitor::{ProcessMemoryMonitor, ResourceMonitor};
use crate::outcome::{ExecutionOutcome, ExecutionStats};
use crate::scoped::{GuardedCache, ScopedLogger};
use crate::validation::validate_context;

const SANDBOX_TARGET: &str = "argus_sandbox::sandbox";

struct ActiveExecution {
    generation: u64,
    token: CancellationToken,
}

/// Claim on the active-execution table for one plugin name.
///
/// Dropping the slot releases the name unless a supervisor already evicted
/// it and a newer execution has claimed it since.
struct ExecutionSlot<'a> {
    active: &'a Mutex<HashMap<String, ActiveExecution>>,
    name: String,
    generation: u64,
    token: CancellationToken,
}

impl Drop for ExecutionSlot<'_> {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if active
            .get(&self.name)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            active.remove(&self.name);
        }
    }
}

/// Runs plugins under time and resource bounds.
///
/// Every call to [`Sandbox::execute_plugin`] ends in an
/// [`ExecutionOutcome`]; plugin failures, panics, timeouts and malformed
/// results are all converted into error-status results.
///
/// At most one execution per plugin name is in flight. A second concurrent
/// request for the same name is rejected with
/// [`FailureKind::AlreadyExecuting`] rather than queued.
pub struct Sandbox {
    limits: SandboxLimits,
    monitor: Arc<dyn ResourceMonitor>,
    active: Mutex<HashMap<String, ActiveExecution>>,
    stats: Mutex<HashMap<String, ExecutionStats>>,
    next_generation: AtomicU64,
}

impl Sandbox {
    /// Creates a sandbox with the given limits and resource monitor.
    #[must_use]
    pub fn new(limits: SandboxLimits, monitor: Arc<dyn ResourceMonitor>) -> Self {
        Self {
            limits,
            monitor,
            active: Mutex::new(HashMap::new()),
            stats: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Creates a sandbox that samples the memory of the current process.
    #[must_use]
    pub fn with_process_monitor(limits: SandboxLimits) -> Self {
        Self::new(limits, Arc::new(ProcessMemoryMonitor::new()))
    }

    /// Limits enforced by this sandbox.
    #[must_use]
    pub const fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Executes `plugin` against `context`, bounded by `timeout`.
    ///
    /// The plugin receives a copy of the context whose logger is prefixed
    /// with the plugin name, whose cache is confined to the plugin's
    /// namespace, and whose cancellation token fires on timeout, resource
    /// breach, or [`Sandbox::stop_plugin`]. On any of those the sandbox
    /// aborts the plugin task and returns immediately without waiting for it
    /// to wind down.
    ///
    /// The measured wall-clock time is stamped onto the returned result.
    pub async fn execute_plugin(
        &self,
        plugin: Arc<dyn Plugin>,
        context: &ExecutionContext,
        timeout: Duration,
    ) -> ExecutionOutcome {
        let name = plugin.name().to_owned();
        let started = Instant::now();

        let Some(slot) = self.claim(&name, context.cancellation()) else {
            warn!(
                target: SANDBOX_TARGET,
                plugin = %name,
                "rejecting concurrent execution"
            );
            return ExecutionOutcome::failed(
                FailureKind::AlreadyExecuting,
                &name,
                format!("plugin '{name}' is already executing"),
            );
        };

        let mut outcome = match validate_context(context, &self.limits) {
            Ok(()) => {
                let guarded = self.guard_context(&name, context, slot.token.clone());
                self.supervise(plugin, guarded, &slot.token, timeout).await
            }
            Err(error) => ExecutionOutcome::failed(
                FailureKind::InvalidContext,
                &name,
                format!("invalid execution context: {error}"),
            ),
        };
        drop(slot);

        let elapsed = started.elapsed();
        outcome.result_mut().set_execution_time(elapsed);
        self.record(&name, &outcome, elapsed);
        debug!(
            target: SANDBOX_TARGET,
            plugin = %name,
            elapsed_ms = millis(elapsed),
            failure = ?outcome.failure_kind(),
            "plugin execution finished"
        );
        outcome
    }

    /// Forcibly evicts `name` from the active-execution set and signals its
    /// cancellation token.
    ///
    /// Returns `true` when an execution was evicted. The name becomes
    /// available for a new execution immediately.
    pub fn stop_plugin(&self, name: &str) -> bool {
        let Some(evicted) = self.active.lock().remove(name) else {
            return false;
        };
        evicted.token.cancel();
        warn!(target: SANDBOX_TARGET, plugin = name, "stopped plugin execution");
        true
    }

    /// Names of plugins currently executing, sorted.
    #[must_use]
    pub fn active_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self.active.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns `true` while `name` is executing.
    #[must_use]
    pub fn is_executing(&self, name: &str) -> bool {
        self.active.lock().contains_key(name)
    }

    /// Execution counters for `name`, if it has run in this sandbox.
    #[must_use]
    pub fn stats(&self, name: &str) -> Option<ExecutionStats> {
        self.stats.lock().get(name).copied()
    }

    fn claim(&self, name: &str, parent: &CancellationToken) -> Option<ExecutionSlot<'_>> {
        let mut active = self.active.lock();
        let Entry::Vacant(vacant) = active.entry(name.to_owned()) else {
            return None;
        };
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = parent.child_token();
        vacant.insert(ActiveExecution {
            generation,
            token: token.clone(),
        });
        Some(ExecutionSlot {
            active: &self.active,
            name: name.to_owned(),
            generation,
            token,
        })
    }

    fn guard_context(
        &self,
        name: &str,
        context: &ExecutionContext,
        token: CancellationToken,
    ) -> ExecutionContext {
        let logger: Arc<dyn Logger> = Arc::new(ScopedLogger::new(name, context.logger_handle()));
        let guarded = context
            .clone()
            .with_logger(logger)
            .with_cancellation(token);
        match context.cache() {
            Some(cache) => guarded.with_cache(Arc::new(GuardedCache::new(
                name,
                Arc::clone(cache),
                &self.limits,
            ))),
            None => guarded,
        }
    }

    async fn supervise(
        &self,
        plugin: Arc<dyn Plugin>,
        context: ExecutionContext,
        token: &CancellationToken,
        timeout: Duration,
    ) -> ExecutionOutcome {
        let name = plugin.name().to_owned();
        let span = info_span!(target: SANDBOX_TARGET, "plugin", plugin = %name);
        let mut task = tokio::spawn(
            async move { plugin.execute(&context).await }.instrument(span),
        );

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut sampler = tokio::time::interval(self.limits.sample_interval());
        sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ceiling = self.limits.memory_ceiling_bytes();

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    task.abort();
                    return ExecutionOutcome::failed(
                        FailureKind::Stopped,
                        &name,
                        format!("plugin '{name}' was stopped before completing"),
                    );
                }
                joined = &mut task => return settle(&name, joined),
                () = &mut deadline => {
                    task.abort();
                    token.cancel();
                    warn!(
                        target: SANDBOX_TARGET,
                        plugin = %name,
                        timeout_ms = millis(timeout),
                        "plugin timed out"
                    );
                    return ExecutionOutcome::failed(
                        FailureKind::Timeout,
                        &name,
                        format!("plugin '{name}' timed out after {} ms", timeout.as_millis()),
                    );
                }
                _ = sampler.tick() => {
                    if let Some(used) = self
                        .monitor
                        .memory_usage_bytes()
                        .filter(|used| *used > ceiling)
                    {
                        task.abort();
                        token.cancel();
                        warn!(
                            target: SANDBOX_TARGET,
                            plugin = %name,
                            used_bytes = used,
                            ceiling_bytes = ceiling,
                            "plugin breached memory ceiling"
                        );
                        return ExecutionOutcome::failed(
                            FailureKind::ResourceLimit,
                            &name,
                            format!(
                                "memory usage of {used} bytes exceeded the ceiling of {ceiling} bytes"
                            ),
                        );
                    }
                }
            }
        }
    }

    fn record(&self, name: &str, outcome: &ExecutionOutcome, elapsed: Duration) {
        let kind = outcome.failure_kind();
        if kind == Some(FailureKind::AlreadyExecuting) {
            return;
        }
        let mut stats = self.stats.lock();
        let entry = stats.entry(name.to_owned()).or_default();
        match kind {
            None => entry.record_success(elapsed),
            Some(FailureKind::Timeout) => entry.record_timeout(elapsed),
            Some(FailureKind::ResourceLimit) => entry.record_resource_breach(elapsed),
            Some(_) => entry.record_failure(elapsed),
        }
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox")
            .field("limits", &self.limits)
            .field("active", &self.active_plugins())
            .finish_non_exhaustive()
    }
}

/// Converts the joined plugin task into an outcome.
fn settle(
    name: &str,
    joined: Result<Result<RawToolResult, PluginFailure>, JoinError>,
) -> ExecutionOutcome {
    match joined {
        Ok(Ok(result)) => match result.validate() {
            Ok(()) => ExecutionOutcome::Completed(result),
            Err(error) => ExecutionOutcome::failed(
                FailureKind::InvalidResult,
                name,
                format!("plugin '{name}' returned an invalid result: {error}"),
            ),
        },
        Ok(Err(failure)) => ExecutionOutcome::failed(
            FailureKind::Execution,
            name,
            format!("plugin '{name}' failed: {}", failure.message()),
        ),
        Err(error) if error.is_panic() => ExecutionOutcome::failed(
            FailureKind::Panicked,
            name,
            format!(
                "plugin '{name}' panicked: {}",
                panic_message(error.into_panic().as_ref())
            ),
        ),
        Err(_) => ExecutionOutcome::failed(
            FailureKind::Stopped,
            name,
            format!("plugin '{name}' task was cancelled"),
        ),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("unknown panic payload"))
}
