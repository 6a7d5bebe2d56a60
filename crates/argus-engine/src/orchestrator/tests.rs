//! Unit tests for run orchestration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use argus_config::{OrchestratorConfig, RetryPolicy, SandboxLimits};
use argus_plugins::test_support::{Journal, StubBehaviour, StubPlugin, memory_cache};
use argus_plugins::{
    Capabilities, DependencyError, ExecutionContext, Plugin, ProjectConfiguration, RawIssue,
    RawToolResult, RegistrationError, ToolConfiguration, ToolStatus,
};
use argus_sandbox::{ResourceMonitor, Sandbox};
use rstest::rstest;

use super::*;
use crate::normalizer::NormalizedResult;

struct QuietMonitor;

impl ResourceMonitor for QuietMonitor {
    fn memory_usage_bytes(&self) -> Option<u64> {
        None
    }
}

fn engine_with(config: OrchestratorConfig) -> AnalysisEngine {
    let sandbox = Arc::new(Sandbox::new(config.sandbox().clone(), Arc::new(QuietMonitor)));
    AnalysisEngine::with_sandbox(config, sandbox).expect("valid configuration")
}

fn engine() -> AnalysisEngine {
    engine_with(OrchestratorConfig::default())
}

fn context() -> ExecutionContext {
    ExecutionContext::new("/srv/project")
}

async fn register(engine: &AnalysisEngine, plugins: &[&Arc<StubPlugin>]) {
    for plugin in plugins {
        engine
            .register_plugin(Arc::clone(plugin) as Arc<dyn Plugin>, None)
            .await
            .expect("registration succeeds");
    }
}

fn status_of(result: &AnalysisResult, tool: &str) -> ToolStatus {
    result
        .tool_result(tool)
        .map(NormalizedResult::status)
        .expect("tool has a result")
}

// ---------------------------------------------------------------------------
// Partial failure and ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_plugin_does_not_remove_siblings() {
    let engine = engine();
    let linter = StubPlugin::new("linter").shared();
    let formatter = StubPlugin::new("formatter").shared();
    let typechecker = StubPlugin::new("typechecker")
        .with_behaviour(StubBehaviour::Fail(String::from("type error in main.ts")))
        .shared();
    register(&engine, &[&linter, &formatter, &typechecker]).await;

    let result = engine
        .execute_analysis("web", &context(), &AnalysisOptions::new())
        .await
        .expect("run completes");

    assert_eq!(result.project_id(), "web");
    assert_eq!(result.tool_results().len(), 3);
    assert_eq!(status_of(&result, "typechecker"), ToolStatus::Error);
    assert_eq!(status_of(&result, "linter"), ToolStatus::Success);
    assert_eq!(status_of(&result, "formatter"), ToolStatus::Success);
    assert!(result.has_failures());
}

#[tokio::test(start_paused = true)]
async fn dependents_wait_for_the_previous_group() {
    let engine = engine();
    let journal = Journal::new();
    let base = StubPlugin::new("base")
        .with_behaviour(StubBehaviour::Sleep(Duration::from_millis(200)))
        .with_journal(journal.clone())
        .shared();
    let left = StubPlugin::new("left")
        .with_dependencies(&["base"])
        .with_behaviour(StubBehaviour::Sleep(Duration::from_millis(50)))
        .with_journal(journal.clone())
        .shared();
    let right = StubPlugin::new("right")
        .with_dependencies(&["base"])
        .with_behaviour(StubBehaviour::Sleep(Duration::from_millis(50)))
        .with_journal(journal.clone())
        .shared();
    register(&engine, &[&left, &right, &base]).await;

    let result = engine
        .execute_analysis("web", &context(), &AnalysisOptions::new())
        .await
        .expect("run completes");

    let base_done = journal.position("finish:base").expect("base finished");
    for dependent in ["start:left", "start:right"] {
        let started = journal.position(dependent).expect("dependent started");
        assert!(base_done < started, "{dependent} began before base finished");
    }
    let left_done = journal.position("finish:left").expect("left finished");
    assert!(journal.position("start:right").expect("right started") < left_done);

    assert_eq!(result.plan().groups(), [vec!["base"], vec!["left", "right"]]);
    let tools: Vec<_> = result
        .tool_results()
        .iter()
        .map(NormalizedResult::tool)
        .collect();
    assert_eq!(tools, ["base", "left", "right"]);
}

#[tokio::test]
async fn failed_dependency_still_runs_dependents() {
    let engine = engine();
    let base = StubPlugin::new("base")
        .with_behaviour(StubBehaviour::Panic(String::from("boom")))
        .shared();
    let dependent = StubPlugin::new("dependent").with_dependencies(&["base"]).shared();
    register(&engine, &[&base, &dependent]).await;

    let result = engine
        .execute_analysis("web", &context(), &AnalysisOptions::new())
        .await
        .expect("run completes");

    assert_eq!(status_of(&result, "base"), ToolStatus::Error);
    assert_eq!(status_of(&result, "dependent"), ToolStatus::Success);
    assert_eq!(dependent.executions(), 1);
}

// ---------------------------------------------------------------------------
// Configuration-time rejection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_plugins_fail_before_execution() {
    let engine = engine();
    let linter = StubPlugin::new("linter").shared();
    register(&engine, &[&linter]).await;

    let err = engine
        .execute_analysis(
            "web",
            &context(),
            &AnalysisOptions::new().with_plugins(["linter", "rubocop"]),
        )
        .await
        .expect_err("unknown plugin");

    assert_eq!(
        err,
        EngineError::UnknownPlugins {
            names: vec![String::from("rubocop")]
        }
    );
    assert_eq!(linter.executions(), 0);
}

#[tokio::test]
async fn excluded_dependency_fails_before_execution() {
    let engine = engine();
    let base = StubPlugin::new("base").shared();
    let dependent = StubPlugin::new("dependent").with_dependencies(&["base"]).shared();
    register(&engine, &[&base, &dependent]).await;

    let err = engine
        .execute_analysis(
            "web",
            &context(),
            &AnalysisOptions::new().with_plugins(["dependent"]),
        )
        .await
        .expect_err("subgraph is not closed");

    assert_eq!(
        err,
        EngineError::InvalidDependencies {
            errors: vec![DependencyError::Excluded {
                plugin: "dependent".into(),
                dependency: "base".into(),
            }]
        }
    );
    assert_eq!(dependent.executions(), 0);
}

#[tokio::test]
async fn requested_subset_runs_alone() {
    let engine = engine();
    let linter = StubPlugin::new("linter").shared();
    let formatter = StubPlugin::new("formatter").shared();
    register(&engine, &[&linter, &formatter]).await;

    let result = engine
        .execute_analysis(
            "web",
            &context(),
            &AnalysisOptions::new().with_plugins(["formatter", "formatter"]),
        )
        .await
        .expect("run completes");

    assert_eq!(result.tool_results().len(), 1);
    assert_eq!(formatter.executions(), 1);
    assert_eq!(linter.executions(), 0);
}

#[tokio::test]
async fn disabled_tools_are_left_out_of_default_runs() {
    let engine = engine();
    let linter = StubPlugin::new("linter").shared();
    let formatter = StubPlugin::new("formatter").shared();
    register(&engine, &[&linter, &formatter]).await;
    let project = ProjectConfiguration::new("web", "1.0.0")
        .with_tool(ToolConfiguration::new("formatter").with_enabled(false));

    let plan = engine
        .plan(&context().with_config(project), &AnalysisOptions::new())
        .await
        .expect("plan");

    assert_eq!(plan.flatten(), ["linter"]);
}

// ---------------------------------------------------------------------------
// Retry and timeouts
// ---------------------------------------------------------------------------

fn fast_timeout(tool: &str) -> ExecutionContext {
    let project = ProjectConfiguration::new("web", "1.0.0")
        .with_tool(ToolConfiguration::new(tool).with_timeout_ms(50));
    context().with_config(project)
}

#[tokio::test(start_paused = true)]
async fn transient_failure_is_retried() {
    let engine = engine();
    let jest = StubPlugin::new("jest")
        .with_script([StubBehaviour::Sleep(Duration::from_secs(600))])
        .shared();
    register(&engine, &[&jest]).await;

    let result = engine
        .execute_analysis("web", &fast_timeout("jest"), &AnalysisOptions::new())
        .await
        .expect("run completes");

    let jest_result = result.tool_result("jest").expect("jest result");
    assert_eq!(jest_result.status(), ToolStatus::Success);
    assert_eq!(jest_result.tool_metrics().get(RETRIES_METRIC), Some(&1.0));
    assert_eq!(jest.executions(), 2);
}

#[tokio::test(start_paused = true)]
async fn retries_stop_at_the_configured_maximum() {
    let config = OrchestratorConfig::default().with_retry(RetryPolicy::new(2, 10));
    let engine = engine_with(config);
    let jest = StubPlugin::new("jest")
        .with_behaviour(StubBehaviour::Sleep(Duration::from_secs(600)))
        .shared();
    register(&engine, &[&jest]).await;

    let result = engine
        .execute_analysis("web", &fast_timeout("jest"), &AnalysisOptions::new())
        .await
        .expect("run completes");

    let jest_result = result.tool_result("jest").expect("jest result");
    assert_eq!(jest_result.status(), ToolStatus::Error);
    assert!(
        jest_result
            .issues()
            .iter()
            .any(|issue| issue.message().contains("timed out after 50 ms"))
    );
    assert_eq!(jest.executions(), 3);
}

#[tokio::test]
async fn execution_failures_are_not_retried() {
    let engine = engine();
    let tsc = StubPlugin::new("tsc")
        .with_behaviour(StubBehaviour::Fail(String::from("bad tsconfig")))
        .shared();
    register(&engine, &[&tsc]).await;

    let result = engine
        .execute_analysis("web", &context(), &AnalysisOptions::new())
        .await
        .expect("run completes");

    assert_eq!(status_of(&result, "tsc"), ToolStatus::Error);
    assert_eq!(tsc.executions(), 1);
}

#[tokio::test(start_paused = true)]
async fn tool_timeout_overrides_the_default() {
    let config = OrchestratorConfig::default().with_retry(RetryPolicy::disabled());
    let engine = engine_with(config);
    let slow = StubPlugin::new("slow")
        .with_behaviour(StubBehaviour::Sleep(Duration::from_secs(10)))
        .shared();
    register(&engine, &[&slow]).await;

    let bounded = engine
        .execute_analysis("web", &fast_timeout("slow"), &AnalysisOptions::new())
        .await
        .expect("run completes");
    let unbounded = engine
        .execute_analysis("web", &context(), &AnalysisOptions::new())
        .await
        .expect("run completes");

    assert_eq!(status_of(&bounded, "slow"), ToolStatus::Error);
    assert_eq!(status_of(&unbounded, "slow"), ToolStatus::Success);
}

// ---------------------------------------------------------------------------
// Incremental runs and caching
// ---------------------------------------------------------------------------

#[rstest]
#[case::irrelevant_change(&["web/app.ts"], 0)]
#[case::relevant_change(&["pkg/Module.PY"], 1)]
#[tokio::test]
async fn incremental_runs_skip_unaffected_plugins(
    #[case] changed: &[&str],
    #[case] expected_executions: u32,
) {
    let engine = engine();
    let pylint = StubPlugin::new("pylint")
        .with_capabilities(Capabilities::none().with_incremental())
        .with_file_extensions(&["py"])
        .with_behaviour(StubBehaviour::Report(
            RawToolResult::success("pylint").with_issue(RawIssue::new("convention", "C0114")),
        ))
        .shared();
    register(&engine, &[&pylint]).await;

    let result = engine
        .execute_analysis(
            "web",
            &context().with_changed_files(changed.iter().copied()),
            &AnalysisOptions::new().incremental(true),
        )
        .await
        .expect("run completes");

    assert_eq!(pylint.executions(), expected_executions);
    let pylint_result = result.tool_result("pylint").expect("pylint result");
    assert_eq!(pylint_result.status(), ToolStatus::Success);
    if expected_executions == 0 {
        assert!(pylint_result.issues().is_empty());
        assert_eq!(pylint_result.tool_metrics().get(SKIPPED_METRIC), Some(&1.0));
    }
}

#[tokio::test]
async fn non_incremental_plugins_always_run() {
    let engine = engine();
    let tsc = StubPlugin::new("tsc").with_file_extensions(&["ts"]).shared();
    register(&engine, &[&tsc]).await;

    engine
        .execute_analysis(
            "web",
            &context().with_changed_files(["README.md"]),
            &AnalysisOptions::new().incremental(true),
        )
        .await
        .expect("run completes");

    assert_eq!(tsc.executions(), 1);
}

#[rstest]
#[case::enabled_and_supported(true, true, true)]
#[case::disabled(false, true, false)]
#[case::unsupported(true, false, false)]
#[tokio::test]
async fn cache_reaches_only_capable_plugins(
    #[case] enabled: bool,
    #[case] supported: bool,
    #[case] expected: bool,
) {
    let engine = engine();
    let capabilities = if supported {
        Capabilities::none().with_cache()
    } else {
        Capabilities::none()
    };
    let eslint = StubPlugin::new("eslint")
        .with_capabilities(capabilities)
        .shared();
    register(&engine, &[&eslint]).await;

    engine
        .execute_analysis(
            "web",
            &context().with_cache(memory_cache()),
            &AnalysisOptions::new().enable_cache(enabled),
        )
        .await
        .expect("run completes");

    assert_eq!(eslint.cache_observations(), [expected]);
}

// ---------------------------------------------------------------------------
// Registration lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registration_initialises_with_project_configuration() {
    let engine = engine();
    let linter = StubPlugin::new("linter").shared();
    let project = ProjectConfiguration::new("web", "1.0.0").with_tool(ToolConfiguration::new("linter"));

    engine
        .register_plugin(Arc::clone(&linter) as Arc<dyn Plugin>, Some(&project))
        .await
        .expect("registration succeeds");

    assert_eq!(linter.initialisations(), 1);
    assert_eq!(engine.plugin_names().await, ["linter"]);
}

#[tokio::test]
async fn duplicate_registration_is_rejected_without_initialising() {
    let engine = engine();
    let first = StubPlugin::new("linter").shared();
    let second = StubPlugin::new("linter").shared();
    register(&engine, &[&first]).await;

    let err = engine
        .register_plugin(Arc::clone(&second) as Arc<dyn Plugin>, None)
        .await
        .expect_err("duplicate");

    assert_eq!(
        err,
        EngineError::Registration(RegistrationError::Duplicate {
            name: "linter".into()
        })
    );
    assert_eq!(second.initialisations(), 0);
    assert_eq!(engine.plugin_names().await.len(), 1);
}

#[rstest]
#[case::rejected_config(
    StubPlugin::new("linter").with_config_errors(&["unknown rule 'semi'"]),
    "rejected its configuration: unknown rule 'semi'"
)]
#[case::failed_initialise(
    StubPlugin::new("linter").with_failing_initialize("binary not found"),
    "failed to initialise: binary not found"
)]
#[tokio::test]
async fn rejected_plugins_are_not_registered(#[case] plugin: StubPlugin, #[case] expected: &str) {
    let engine = engine();

    let err = engine
        .register_plugin(plugin.shared(), None)
        .await
        .expect_err("registration fails");

    assert!(err.to_string().contains(expected), "unexpected error: {err}");
    assert!(engine.plugin_names().await.is_empty());
}

#[tokio::test]
async fn shutdown_cleans_up_every_plugin() {
    let engine = engine();
    let linter = StubPlugin::new("linter").shared();
    let formatter = StubPlugin::new("formatter")
        .with_dependencies(&["linter"])
        .with_failing_cleanup("socket already closed")
        .shared();
    register(&engine, &[&linter, &formatter]).await;

    assert_eq!(engine.shutdown().await, 2);
    assert_eq!(linter.cleanups(), 1);
    assert_eq!(formatter.cleanups(), 1);
    assert!(engine.plugin_names().await.is_empty());
}

#[tokio::test]
async fn plugin_metrics_sit_beside_sandbox_stats() {
    let engine = engine();
    let ruff = StubPlugin::new("ruff")
        .with_script([
            StubBehaviour::Fail(String::from("config parse error")),
            StubBehaviour::Succeed,
        ])
        .shared();
    register(&engine, &[&ruff]).await;

    for _ in 0..2 {
        engine
            .execute_analysis("py", &context(), &AnalysisOptions::new())
            .await
            .expect("run completes");
    }

    let reported = engine.plugin_metrics("ruff").await.expect("registered");
    assert_eq!(reported.executions(), 2);
    assert_eq!(reported.failures(), 1);
    let measured = engine.sandbox().stats("ruff").expect("executed");
    assert_eq!(measured.executions(), 2);
    assert_eq!(measured.failures(), 1);
    assert!(engine.plugin_metrics("ghost").await.is_none());
}

#[tokio::test]
async fn unregistering_unknown_plugin_fails() {
    let err = engine()
        .unregister_plugin("ghost")
        .await
        .err()
        .expect("not registered");
    assert!(matches!(
        err,
        EngineError::Registration(RegistrationError::NotFound { .. })
    ));
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = OrchestratorConfig::default().with_default_timeout_ms(0);
    let err = AnalysisEngine::new(config).expect_err("zero timeout");
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn sandbox_with_unusable_limits_is_rejected() {
    let limits = SandboxLimits::default().with_sample_interval_ms(0);
    let sandbox = Arc::new(Sandbox::new(limits, Arc::new(QuietMonitor)));
    let err = AnalysisEngine::with_sandbox(OrchestratorConfig::default(), sandbox)
        .expect_err("zero sampling interval");
    assert!(err.to_string().contains("sandbox.sample_interval_ms"));
}

#[tokio::test(start_paused = true)]
async fn registration_waits_for_in_flight_run() {
    let engine = engine();
    let slow = StubPlugin::new("slow")
        .with_behaviour(StubBehaviour::Sleep(Duration::from_secs(5)))
        .shared();
    register(&engine, &[&slow]).await;
    let late = StubPlugin::new("late").shared();
    let run_finished = AtomicBool::new(false);
    let context = context();
    let options = AnalysisOptions::new();

    let (run, finished_before_register) = tokio::join!(
        async {
            let result = engine.execute_analysis("web", &context, &options).await;
            run_finished.store(true, Ordering::SeqCst);
            result
        },
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine
                .register_plugin(Arc::clone(&late) as Arc<dyn Plugin>, None)
                .await
                .expect("registration succeeds");
            run_finished.load(Ordering::SeqCst)
        },
    );

    assert!(finished_before_register);
    let run = run.expect("run completes");
    assert_eq!(run.tool_results().len(), 1);
    assert_eq!(late.executions(), 0);
    assert_eq!(engine.plugin_names().await, ["slow", "late"]);
}

#[tokio::test(start_paused = true)]
async fn unregistration_waits_for_in_flight_run() {
    let engine = engine();
    let slow = StubPlugin::new("slow")
        .with_behaviour(StubBehaviour::Sleep(Duration::from_secs(5)))
        .shared();
    register(&engine, &[&slow]).await;
    let context = context();
    let options = AnalysisOptions::new();

    let (run, removed) = tokio::join!(
        engine.execute_analysis("web", &context, &options),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.unregister_plugin("slow").await.is_ok()
        },
    );

    assert!(removed);
    let run = run.expect("run completes");
    assert_eq!(status_of(&run, "slow"), ToolStatus::Success);
    assert_eq!(slow.executions(), 1);
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summary_and_score_reflect_normalised_issues() {
    let engine = engine();
    let eslint = StubPlugin::new("eslint")
        .with_behaviour(StubBehaviour::Report(
            RawToolResult::new("eslint", ToolStatus::Warning)
                .with_issue(RawIssue::new("error", "no-undef").with_file("./a.js"))
                .with_issue(RawIssue::new("warn", "no-console").with_file("a.js").fixable())
                .with_issue(RawIssue::new("hint", "prefer-const").fixable()),
        ))
        .shared();
    let tsc = StubPlugin::new("tsc")
        .with_behaviour(StubBehaviour::Fail(String::from("crashed")))
        .shared();
    register(&engine, &[&eslint, &tsc]).await;

    let result = engine
        .execute_analysis("web", &context(), &AnalysisOptions::new())
        .await
        .expect("run completes");

    let summary = result.summary();
    assert_eq!(summary.total_issues(), 4);
    assert_eq!(summary.total_errors(), 2);
    assert_eq!(summary.total_warnings(), 1);
    assert_eq!(summary.total_fixable(), 2);
    // 100 - 2*5 - 2 - 0.5 - 10 for the failed tool.
    assert_eq!(result.overall_score(), 77.5);
}
