//! Execution of a single plugin within a run.

use std::sync::Arc;
use std::time::Duration;

use argus_config::RetryPolicy;
use argus_plugins::{ExecutionContext, Plugin, RawToolResult};
use argus_sandbox::Sandbox;
use tracing::{debug, warn};

use super::ORCHESTRATOR_TARGET;

/// Metric recorded on results that needed retries.
pub const RETRIES_METRIC: &str = "retries";

/// Metric recorded on results of plugins skipped by incremental runs.
pub const SKIPPED_METRIC: &str = "skipped";

/// Everything one spawned task needs to produce a plugin's raw result.
pub(super) struct PluginJob {
    pub(super) plugin: Arc<dyn Plugin>,
    pub(super) sandbox: Arc<Sandbox>,
    pub(super) context: ExecutionContext,
    pub(super) timeout: Duration,
    pub(super) retry: RetryPolicy,
    pub(super) incremental: bool,
    pub(super) cache: bool,
}

impl PluginJob {
    pub(super) async fn run(self) -> (String, RawToolResult) {
        let name = self.plugin.name().to_owned();

        if self.is_irrelevant() {
            debug!(
                target: ORCHESTRATOR_TARGET,
                plugin = %name,
                "no changed file concerns plugin; skipping"
            );
            let skipped = RawToolResult::success(name.as_str()).with_metric(SKIPPED_METRIC, 1.0);
            return (name, skipped);
        }

        let context = if self.cache && self.plugin.supports_cache() {
            self.context.clone()
        } else {
            self.context.clone().without_cache()
        };

        let mut retries = 0_u32;
        loop {
            let outcome = self
                .sandbox
                .execute_plugin(Arc::clone(&self.plugin), &context, self.timeout)
                .await;
            let retryable = outcome.is_transient_failure()
                && retries < self.retry.max_retries()
                && !context.is_cancelled();
            if !retryable {
                let result = outcome.into_result();
                let reported = if retries > 0 {
                    result.with_metric(RETRIES_METRIC, f64::from(retries))
                } else {
                    result
                };
                return (name, reported);
            }

            retries = retries.saturating_add(1);
            let delay = self.retry.backoff_for(retries);
            warn!(
                target: ORCHESTRATOR_TARGET,
                plugin = %name,
                retry = retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                failure = ?outcome.failure_kind(),
                "retrying transient plugin failure"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// An incremental run skips a capable plugin when a changed-file set is
    /// present and none of its entries is relevant to the plugin.
    fn is_irrelevant(&self) -> bool {
        if !self.incremental || !self.plugin.supports_incremental() {
            return false;
        }
        self.context
            .changed_files()
            .is_some_and(|files| !files.iter().any(|file| self.plugin.handles_file(file)))
    }
}
