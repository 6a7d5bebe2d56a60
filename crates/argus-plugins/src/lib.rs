//! Plugin contract, registry, and dependency resolution for Argus.
//!
//! The `argus-plugins` crate defines what an analyzer plugin is and how a set
//! of them is organised before anything runs. Adapters for concrete tools
//! implement the [`Plugin`] trait; the [`PluginRegistry`] stores them by
//! unique name; the [`DependencyResolver`] validates the declared dependency
//! graph and turns it into an [`ExecutionPlan`] of groups that may run
//! concurrently.
//!
//! Execution itself lives in `argus-sandbox` (bounded, single-flight runs of
//! one plugin) and `argus-engine` (whole-project orchestration and result
//! normalisation).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use argus_plugins::{
//!     DependencyResolver, ExecutionContext, Plugin, PluginDescriptor, PluginFailure,
//!     PluginRegistry, RawToolResult,
//! };
//!
//! struct Typecheck(PluginDescriptor);
//!
//! #[async_trait]
//! impl Plugin for Typecheck {
//!     fn descriptor(&self) -> &PluginDescriptor {
//!         &self.0
//!     }
//!
//!     async fn execute(&self, _: &ExecutionContext) -> Result<RawToolResult, PluginFailure> {
//!         Ok(RawToolResult::success(self.name()))
//!     }
//! }
//!
//! let mut registry = PluginRegistry::new();
//! registry
//!     .register(Arc::new(Typecheck(PluginDescriptor::new("tsc", "5.4.0"))))
//!     .expect("registration succeeds");
//!
//! let order = DependencyResolver::new(&registry)
//!     .resolve_execution_order()
//!     .expect("graph is acyclic");
//! assert_eq!(order, ["tsc"]);
//! ```

pub mod cache;
pub mod context;
pub mod contract;
pub mod descriptor;
pub mod error;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod result;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod tests;

pub use self::cache::{Cache, MemoryCache, fingerprint};
pub use self::context::{ExecutionContext, LogLevel, Logger, TracingLogger};
pub use self::contract::{
    ConfigValidation, Plugin, PluginMetrics, ProjectConfiguration, ToolConfiguration,
};
pub use self::descriptor::{Capabilities, PluginDescriptor};
pub use self::error::{
    CacheError, DependencyError, PluginFailure, RegistrationError, ResultShapeError,
};
pub use self::registry::{DependencyNode, PluginRegistry};
pub use self::resolver::{
    CompatibilityPolicy, CompatibilityReport, DependencyResolver, ExecutionPlan, GraphValidation,
    PermissiveCompatibility,
};
pub use self::result::{RawIssue, RawToolResult, ToolStatus};
