//! Bounded execution of Argus analyzer plugins.
//!
//! The `argus-sandbox` crate runs one plugin at a time per name and makes
//! sure a misbehaving plugin cannot take the orchestrator down with it. A
//! [`Sandbox`] enforces:
//!
//! - single-flight execution per plugin name, rejecting rather than queueing
//!   a concurrent request;
//! - a wall-clock timeout and a memory ceiling sampled on a fixed interval,
//!   both of which abort the plugin task without waiting for it;
//! - structural validation of whatever the plugin returns;
//! - a plugin-scoped logger and a size-limited, namespaced cache view.
//!
//! Every path out of [`Sandbox::execute_plugin`] yields an
//! [`ExecutionOutcome`] carrying a [`argus_plugins::RawToolResult`]. Failures
//! are classified by [`FailureKind`] so callers can decide what to retry.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use argus_config::SandboxLimits;
//! use argus_plugins::{ExecutionContext, Plugin};
//! use argus_sandbox::Sandbox;
//!
//! # async fn run(plugin: Arc<dyn Plugin>) {
//! let plugin_name = plugin.name().to_owned();
//! let sandbox = Sandbox::with_process_monitor(SandboxLimits::default());
//! let context = ExecutionContext::new("/srv/project");
//! let outcome = sandbox
//!     .execute_plugin(plugin, &context, Duration::from_secs(30))
//!     .await;
//! assert_eq!(outcome.result().tool(), plugin_name);
//! # }
//! ```

mod error;
mod monitor;
mod outcome;
mod sandbox;
mod scoped;
mod validation;

#[cfg(test)]
mod tests;

pub use error::{FailureKind, SandboxError};
pub use monitor::{ProcessMemoryMonitor, ResourceMonitor};
pub use outcome::{ExecutionOutcome, ExecutionStats};
pub use sandbox::Sandbox;
pub use scoped::{GuardedCache, ScopedLogger};
pub use validation::validate_context;
