//! Tests for engine error rendering.

use rstest::rstest;

use super::*;

#[test]
fn unknown_plugins_are_listed() {
    let error = EngineError::UnknownPlugins {
        names: vec![String::from("rubocop"), String::from("golint")],
    };
    assert_eq!(error.to_string(), "unknown plugins requested: rubocop, golint");
}

#[test]
fn dependency_problems_are_joined() {
    let error = EngineError::InvalidDependencies {
        errors: vec![
            DependencyError::Cycle {
                path: vec!["a".into(), "b".into(), "a".into()],
            },
            DependencyError::SelfDependency { plugin: "c".into() },
        ],
    };
    let rendered = error.to_string();
    assert!(rendered.contains("circular dependency detected: a -> b -> a"));
    assert!(rendered.contains("; plugin 'c' depends on itself"));
}

#[rstest]
#[case::unknown(EngineError::UnknownPlugins { names: vec![] }, true)]
#[case::planning(
    EngineError::Planning(DependencyError::Unschedulable { plugins: vec!["a".into()] }),
    true
)]
#[case::registration(
    EngineError::Registration(RegistrationError::NotFound { name: "a".into() }),
    false
)]
fn classifies_run_rejections(#[case] error: EngineError, #[case] expected: bool) {
    assert_eq!(error.is_run_rejection(), expected);
}
