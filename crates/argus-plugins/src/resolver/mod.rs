//! Dependency graph validation and execution planning.
//!
//! A [`DependencyResolver`] borrows a [`PluginRegistry`] and optionally
//! narrows it to a requested subset of plugins. All traversals walk plugins
//! in registration order, so the same registry always yields the same order,
//! the same groups, and the same cycle report. Traversal state lives in
//! per-pass locals; nothing is written back to the registry.

mod compatibility;
mod plan;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::descriptor::PluginDescriptor;
use crate::error::DependencyError;
use crate::registry::{DependencyNode, PluginRegistry};

pub use compatibility::{CompatibilityPolicy, CompatibilityReport, PermissiveCompatibility};
pub use plan::ExecutionPlan;

/// Findings from [`DependencyResolver::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphValidation {
    errors: Vec<DependencyError>,
    warnings: Vec<String>,
}

impl GraphValidation {
    /// Returns `true` when no errors were found.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Problems that prevent planning.
    #[must_use]
    pub fn errors(&self) -> &[DependencyError] {
        &self.errors
    }

    /// Non-blocking observations such as orphan plugins.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Consumes the report, keeping only the errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<DependencyError> {
        self.errors
    }
}

/// Dependency analysis over a registry or a subset of it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use argus_plugins::{
///     DependencyResolver, ExecutionContext, Plugin, PluginDescriptor, PluginFailure,
///     PluginRegistry, RawToolResult,
/// };
///
/// struct Tool(PluginDescriptor);
///
/// #[async_trait]
/// impl Plugin for Tool {
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
/// for (name, deps) in [("a", vec![]), ("b", vec!["a"]), ("c", vec!["a"])] {
///     let descriptor = PluginDescriptor::new(name, "1.0").with_dependencies(deps);
///     registry.register(Arc::new(Tool(descriptor))).expect("register");
/// }
///
/// let plan = DependencyResolver::new(&registry)
///     .parallel_groups()
///     .expect("acyclic graph");
/// assert_eq!(plan.groups(), [vec!["a"], vec!["b", "c"]]);
/// ```
#[derive(Debug, Clone)]
pub struct DependencyResolver<'a> {
    registry: &'a PluginRegistry,
    scope: Vec<&'a str>,
    members: HashSet<&'a str>,
}

impl<'a> DependencyResolver<'a> {
    /// Resolves over every registered plugin.
    #[must_use]
    pub fn new(registry: &'a PluginRegistry) -> Self {
        let scope: Vec<&str> = registry.names().iter().map(String::as_str).collect();
        let members = scope.iter().copied().collect();
        Self {
            registry,
            scope,
            members,
        }
    }

    /// Resolves over the requested plugins only.
    ///
    /// Names that are not registered are ignored; callers check for unknown
    /// names before planning. Dependencies outside the subset are reported as
    /// [`DependencyError::Excluded`].
    #[must_use]
    pub fn scoped<S: AsRef<str>>(registry: &'a PluginRegistry, names: &[S]) -> Self {
        let requested: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
        let scope: Vec<&str> = registry
            .names()
            .iter()
            .map(String::as_str)
            .filter(|name| requested.contains(name))
            .collect();
        let members = scope.iter().copied().collect();
        Self {
            registry,
            scope,
            members,
        }
    }

    /// Plugins covered by this resolver, in registration order.
    #[must_use]
    pub fn plugins(&self) -> &[&'a str] {
        &self.scope
    }

    /// Reports missing, excluded and self dependencies, every distinct
    /// cycle, and orphan plugins.
    #[must_use]
    pub fn validate(&self) -> GraphValidation {
        let mut report = GraphValidation::default();
        for &name in &self.scope {
            report.errors.extend(
                self.dependencies_of(name)
                    .iter()
                    .filter_map(|dependency| self.edge_error(name, dependency)),
            );
        }

        let mut search = CycleSearch::default();
        for &name in &self.scope {
            search.visit(self, name);
        }
        report.errors.extend(search.cycles);

        if self.scope.len() > 1 {
            report.warnings.extend(
                self.scope
                    .iter()
                    .filter(|name| self.is_orphan(name))
                    .map(|name| format!("plugin '{name}' has no dependencies or dependents")),
            );
        }
        report
    }

    /// Deterministic topological order: dependencies before dependents,
    /// otherwise registration order.
    ///
    /// # Errors
    ///
    /// Returns the first invalid edge or [`DependencyError::Cycle`] naming the
    /// offending path.
    pub fn resolve_execution_order(&self) -> Result<Vec<String>, DependencyError> {
        let mut walk = TopologicalWalk::default();
        for &name in &self.scope {
            walk.visit(self, name)?;
        }
        Ok(walk.order)
    }

    /// Groups plugins into batches that may run concurrently.
    ///
    /// Each group holds every remaining plugin whose dependencies are all in
    /// earlier groups, listed in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first invalid edge, or [`DependencyError::Unschedulable`]
    /// when a cycle leaves plugins that can never be scheduled.
    pub fn parallel_groups(&self) -> Result<ExecutionPlan, DependencyError> {
        self.check_edges()?;
        let mut scheduled: HashSet<&str> = HashSet::new();
        let mut remaining = self.scope.clone();
        let mut groups = Vec::new();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<&str>, Vec<&str>) =
                std::mem::take(&mut remaining).into_iter().partition(|name| {
                    self.dependencies_of(name)
                        .iter()
                        .all(|dependency| scheduled.contains(dependency.as_str()))
                });
            if ready.is_empty() {
                return Err(DependencyError::Unschedulable {
                    plugins: blocked.iter().map(|name| (*name).to_owned()).collect(),
                });
            }
            scheduled.extend(ready.iter().copied());
            groups.push(ready.iter().map(|name| (*name).to_owned()).collect());
            remaining = blocked;
        }
        Ok(ExecutionPlan::new(groups))
    }

    /// Length of the longest dependency chain below each plugin.
    ///
    /// Plugins without dependencies are at level 0.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::resolve_execution_order`].
    pub fn dependency_levels(&self) -> Result<BTreeMap<String, usize>, DependencyError> {
        let order = self.resolve_execution_order()?;
        Ok(self
            .levels_for(&order)
            .into_iter()
            .map(|(name, level)| (name.to_owned(), level))
            .collect())
    }

    /// The longest dependency chain, from its root to its final dependent.
    ///
    /// Ties go to the plugin registered first.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::resolve_execution_order`].
    pub fn critical_path(&self) -> Result<Vec<String>, DependencyError> {
        let order = self.resolve_execution_order()?;
        let levels = self.levels_for(&order);
        let level_of = |name: &str| levels.get(name).copied().unwrap_or_default();

        let Some(mut current) = self
            .scope
            .iter()
            .copied()
            .fold(None, |deepest: Option<&str>, name| match deepest {
                Some(best) if level_of(best) >= level_of(name) => Some(best),
                _ => Some(name),
            })
        else {
            return Ok(Vec::new());
        };

        let mut chain = vec![current.to_owned()];
        while let Some(next) = self
            .dependencies_of(current)
            .iter()
            .map(String::as_str)
            .filter(|dependency| self.members.contains(dependency))
            .find(|dependency| level_of(*dependency).saturating_add(1) == level_of(current))
        {
            chain.push(next.to_owned());
            current = next;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Transitive closure of registered dependencies of `name`.
    ///
    /// Unregistered dependencies are skipped; cycles terminate.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyError::UnknownPlugin`] when `name` is not
    /// registered.
    pub fn all_dependencies(&self, name: &str) -> Result<BTreeSet<String>, DependencyError> {
        if !self.registry.contains(name) {
            return Err(DependencyError::UnknownPlugin {
                name: name.to_owned(),
            });
        }
        let mut closure = BTreeSet::new();
        let mut pending: Vec<&str> = self.dependencies_of(name).iter().map(String::as_str).collect();
        while let Some(dependency) = pending.pop() {
            if !self.registry.contains(dependency) || !closure.insert(dependency.to_owned()) {
                continue;
            }
            pending.extend(self.dependencies_of(dependency).iter().map(String::as_str));
        }
        closure.remove(name);
        Ok(closure)
    }

    /// Checks whether `candidate` could be registered alongside the plugins
    /// already present, using the permissive default policy.
    #[must_use]
    pub fn check_compatibility(&self, candidate: &PluginDescriptor) -> CompatibilityReport {
        self.check_compatibility_with(candidate, &PermissiveCompatibility)
    }

    /// Checks `candidate` for duplicate names plus whatever `policy` reports.
    #[must_use]
    pub fn check_compatibility_with(
        &self,
        candidate: &PluginDescriptor,
        policy: &dyn CompatibilityPolicy,
    ) -> CompatibilityReport {
        let mut conflicts = Vec::new();
        if self.registry.contains(candidate.name()) {
            conflicts.push(format!(
                "plugin '{}' is already registered",
                candidate.name()
            ));
        }
        conflicts.extend(policy.conflicts(candidate, self.registry));
        CompatibilityReport::new(conflicts)
    }

    fn dependencies_of(&self, name: &str) -> &'a [String] {
        self.registry
            .lookup(name)
            .map(DependencyNode::dependencies)
            .unwrap_or_default()
    }

    fn edge_error(&self, plugin: &str, dependency: &str) -> Option<DependencyError> {
        if plugin == dependency {
            return Some(DependencyError::SelfDependency {
                plugin: plugin.to_owned(),
            });
        }
        if !self.registry.contains(dependency) {
            return Some(DependencyError::Missing {
                plugin: plugin.to_owned(),
                dependency: dependency.to_owned(),
            });
        }
        if !self.members.contains(dependency) {
            return Some(DependencyError::Excluded {
                plugin: plugin.to_owned(),
                dependency: dependency.to_owned(),
            });
        }
        None
    }

    fn check_edges(&self) -> Result<(), DependencyError> {
        self.scope
            .iter()
            .find_map(|name| {
                self.dependencies_of(name)
                    .iter()
                    .find_map(|dependency| self.edge_error(name, dependency))
            })
            .map_or(Ok(()), Err)
    }

    /// In-scope dependencies other than the plugin itself.
    fn graph_edges(&self, name: &str) -> Vec<&'a str> {
        self.dependencies_of(name)
            .iter()
            .map(String::as_str)
            .filter(|dependency| *dependency != name && self.members.contains(dependency))
            .collect()
    }

    fn is_orphan(&self, name: &str) -> bool {
        let has_dependents = self.registry.lookup(name).is_some_and(|node| {
            node.dependents()
                .iter()
                .any(|dependent| self.members.contains(dependent.as_str()))
        });
        self.dependencies_of(name).is_empty() && !has_dependents
    }

    fn levels_for<'o>(&self, order: &'o [String]) -> HashMap<&'o str, usize> {
        let mut levels: HashMap<&str, usize> = HashMap::with_capacity(order.len());
        for name in order {
            let level = self
                .dependencies_of(name)
                .iter()
                .filter_map(|dependency| levels.get(dependency.as_str()))
                .max()
                .map_or(0, |deepest| deepest.saturating_add(1));
            levels.insert(name.as_str(), level);
        }
        levels
    }
}

/// State for one depth-first topological pass.
#[derive(Default)]
struct TopologicalWalk<'a> {
    resolved: HashSet<&'a str>,
    visiting: Vec<&'a str>,
    order: Vec<String>,
}

impl<'a> TopologicalWalk<'a> {
    fn visit(
        &mut self,
        resolver: &DependencyResolver<'a>,
        name: &'a str,
    ) -> Result<(), DependencyError> {
        if self.resolved.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.visiting.iter().position(|visiting| *visiting == name) {
            return Err(DependencyError::Cycle {
                path: closed_path(self.visiting.get(start..).unwrap_or_default(), name),
            });
        }

        self.visiting.push(name);
        for dependency in resolver.dependencies_of(name) {
            if let Some(error) = resolver.edge_error(name, dependency) {
                return Err(error);
            }
            self.visit(resolver, dependency.as_str())?;
        }
        self.visiting.pop();
        self.resolved.insert(name);
        self.order.push(name.to_owned());
        Ok(())
    }
}

/// State for one cycle-collecting depth-first pass.
#[derive(Default)]
struct CycleSearch<'a> {
    finished: HashSet<&'a str>,
    path: Vec<&'a str>,
    reported: HashSet<Vec<&'a str>>,
    cycles: Vec<DependencyError>,
}

impl<'a> CycleSearch<'a> {
    fn visit(&mut self, resolver: &DependencyResolver<'a>, name: &'a str) {
        if self.finished.contains(name) {
            return;
        }
        if let Some(start) = self.path.iter().position(|on_path| *on_path == name) {
            let members = self.path.get(start..).unwrap_or_default();
            if self.reported.insert(canonical_rotation(members)) {
                self.cycles.push(DependencyError::Cycle {
                    path: closed_path(members, name),
                });
            }
            return;
        }

        self.path.push(name);
        for dependency in resolver.graph_edges(name) {
            self.visit(resolver, dependency);
        }
        self.path.pop();
        self.finished.insert(name);
    }
}

/// Renders a cycle as its members followed by the repeated entry point.
fn closed_path(members: &[&str], entry: &str) -> Vec<String> {
    members
        .iter()
        .map(|member| (*member).to_owned())
        .chain(std::iter::once(entry.to_owned()))
        .collect()
}

/// Rotates a cycle so its smallest member comes first, so the same cycle
/// found from different entry points compares equal.
fn canonical_rotation<'a>(members: &[&'a str]) -> Vec<&'a str> {
    let pivot = members
        .iter()
        .enumerate()
        .min_by_key(|(_, member)| **member)
        .map_or(0, |(index, _)| index);
    members
        .iter()
        .cycle()
        .skip(pivot)
        .take(members.len())
        .copied()
        .collect()
}
