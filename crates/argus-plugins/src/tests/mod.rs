//! Crate-level integration and BDD tests.

use std::sync::Arc;

use crate::contract::Plugin;
use crate::registry::PluginRegistry;
use crate::resolver::DependencyResolver;
use crate::test_support::StubPlugin;


#[tokio::test]
async fn replanning_after_unregister_drops_the_removed_plugin() {
    let mut registry = PluginRegistry::new();
    for (name, dependencies) in [
        ("lint", &[][..]),
        ("format", &["lint"][..]),
        ("audit", &[][..]),
    ] {
        let plugin: Arc<dyn Plugin> = StubPlugin::new(name)
            .with_dependencies(dependencies)
            .shared();
        registry.register(plugin).expect("register");
    }

    registry.unregister("audit").await.expect("unregister audit");

    let plan = DependencyResolver::new(&registry)
        .parallel_groups()
        .expect("acyclic");
    assert_eq!(plan.groups(), [vec!["lint"], vec!["format"]]);
}
