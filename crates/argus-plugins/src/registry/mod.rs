//! Plugin registry keyed by unique plugin name.
//!
//! The [`PluginRegistry`] owns every registered plugin together with the
//! reverse edges of the dependency graph. Each [`DependencyNode`] records the
//! names of the plugins that depend on it; these back-references are lookup
//! only and never keep a plugin alive. Registration order is preserved so that
//! resolution and planning are deterministic.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::contract::Plugin;
use crate::descriptor::PluginDescriptor;
use crate::error::RegistrationError;

const REGISTRY_TARGET: &str = "argus_plugins::registry";

/// A registered plugin and the names of the plugins that depend on it.
#[derive(Clone)]
pub struct DependencyNode {
    plugin: Arc<dyn Plugin>,
    dependents: BTreeSet<String>,
}

impl DependencyNode {
    fn new(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            plugin,
            dependents: BTreeSet::new(),
        }
    }

    /// The registered plugin.
    #[must_use]
    pub const fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    /// The plugin's descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &PluginDescriptor {
        self.plugin.descriptor()
    }

    /// Names this plugin depends on.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        self.plugin.dependencies()
    }

    /// Names of registered plugins that depend on this one.
    #[must_use]
    pub const fn dependents(&self) -> &BTreeSet<String> {
        &self.dependents
    }
}

impl fmt::Debug for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyNode")
            .field("descriptor", self.descriptor())
            .field("dependents", &self.dependents)
            .finish()
    }
}

/// Registry of analyzer plugins.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use argus_plugins::{
///     ExecutionContext, Plugin, PluginDescriptor, PluginFailure, PluginRegistry,
///     RawToolResult,
/// };
///
/// struct Linter(PluginDescriptor);
///
/// #[async_trait]
/// impl Plugin for Linter {
///     fn descriptor(&self) -> &PluginDescriptor {
///         &self.0
///     }
///
///     async fn execute(&self, _: &ExecutionContext) -> Result<RawToolResult, PluginFailure> {
///         Ok(RawToolResult::success(self.name()))
///     }
/// }
///
/// let mut registry = PluginRegistry::new();
/// registry
///     .register(Arc::new(Linter(PluginDescriptor::new("eslint", "9.0.0"))))
///     .expect("registration succeeds");
/// assert!(registry.lookup("eslint").is_some());
/// assert_eq!(registry.count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct PluginRegistry {
    nodes: HashMap<String, DependencyNode>,
    order: Vec<String>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin after validating its descriptor.
    ///
    /// Dependencies do not need to be registered first; back-references are
    /// linked in whichever order the two plugins arrive.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidDescriptor`] when the descriptor is
    /// malformed and [`RegistrationError::Duplicate`] when the name is taken.
    /// The registry is unchanged on error.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RegistrationError> {
        plugin.descriptor().validate()?;
        let name = plugin.name().to_owned();
        if self.nodes.contains_key(&name) {
            return Err(RegistrationError::Duplicate { name });
        }

        let mut node = DependencyNode::new(plugin);
        node.dependents = self
            .nodes
            .iter()
            .filter(|(_, existing)| existing.descriptor().depends_on(&name))
            .map(|(existing_name, _)| existing_name.clone())
            .collect();
        for dependency in node.dependencies() {
            if let Some(target) = self.nodes.get_mut(dependency) {
                target.dependents.insert(name.clone());
            }
        }

        debug!(
            target: REGISTRY_TARGET,
            plugin = %name,
            dependencies = node.dependencies().len(),
            "registered plugin"
        );
        self.nodes.insert(name.clone(), node);
        self.order.push(name);
        Ok(())
    }

    /// Removes a plugin, invoking its cleanup hook first.
    ///
    /// Cleanup failures are logged and otherwise ignored. The removed plugin
    /// is pruned from the dependents of every other node.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::NotFound`] when no plugin has that name.
    pub async fn unregister(&mut self, name: &str) -> Result<Arc<dyn Plugin>, RegistrationError> {
        let plugin = self
            .nodes
            .get(name)
            .map(|node| Arc::clone(&node.plugin))
            .ok_or_else(|| RegistrationError::NotFound {
                name: name.to_owned(),
            })?;

        if let Err(error) = plugin.cleanup().await {
            warn!(
                target: REGISTRY_TARGET,
                plugin = name,
                error = %error,
                "plugin cleanup failed; unregistering anyway"
            );
        }

        self.nodes.remove(name);
        self.order.retain(|registered| registered != name);
        for node in self.nodes.values_mut() {
            node.dependents.remove(name);
        }
        debug!(target: REGISTRY_TARGET, plugin = name, "unregistered plugin");
        Ok(plugin)
    }

    /// Looks up a node by plugin name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&DependencyNode> {
        self.nodes.get(name)
    }

    /// Looks up a plugin by name.
    #[must_use]
    pub fn plugin(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.nodes.get(name).map(DependencyNode::plugin)
    }

    /// Returns `true` when a plugin with that name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Nodes in registration order.
    pub fn list(&self) -> impl Iterator<Item = &DependencyNode> + '_ {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    /// Plugin names in registration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.order)
            .finish()
    }
}
