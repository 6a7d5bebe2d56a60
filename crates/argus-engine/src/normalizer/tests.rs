//! Unit tests for result normalisation and merging.

use std::time::Duration;

use argus_plugins::{RawIssue, RawToolResult, ToolStatus};
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

#[fixture]
fn normalizer() -> ResultNormalizer {
    let mut normalizer = ResultNormalizer::new();
    normalizer.add_rule(
        "pylint",
        NormalizationRule::new()
            .map_severity("Convention", Severity::Warning)
            .with_category("style")
            .categorise_rule("W0611", "imports"),
    );
    normalizer
}

fn first_issue(result: &NormalizedResult) -> &NormalizedIssue {
    result.issues().first().expect("result has an issue")
}

#[rstest]
fn unmatched_error_maps_to_general_error(normalizer: ResultNormalizer) {
    let raw = RawToolResult::success("eslint").with_issue(RawIssue::new("error", "no-undef"));
    let normalized = normalizer.normalize_result(&raw);

    let issue = first_issue(&normalized);
    assert_eq!(issue.severity(), Severity::Error);
    assert_eq!(issue.category(), DEFAULT_CATEGORY);
    assert_eq!(issue.tool(), "eslint");
}

#[rstest]
#[case::fatal("fatal", Severity::Error)]
#[case::short_error("E", Severity::Error)]
#[case::warn("warn", Severity::Warning)]
#[case::moderate("Moderate", Severity::Warning)]
#[case::note("note", Severity::Info)]
#[case::refactor("refactor", Severity::Info)]
#[case::unrecognised("mystery", Severity::Warning)]
#[case::empty("", Severity::Warning)]
fn shared_vocabulary(#[case] label: &str, #[case] expected: Severity) {
    assert_eq!(Severity::from_label(label), expected);
}

#[rstest]
fn tool_rule_overrides_vocabulary(normalizer: ResultNormalizer) {
    let raw = RawToolResult::success("pylint")
        .with_issue(RawIssue::new("convention", "missing docstring"))
        .with_issue(RawIssue::new("warning", "unused import").with_rule("W0611"));
    let normalized = normalizer.normalize_result(&raw);

    let categories: Vec<_> = normalized
        .issues()
        .iter()
        .map(|issue| (issue.severity(), issue.category()))
        .collect();
    assert_eq!(
        categories,
        [(Severity::Warning, "style"), (Severity::Warning, "imports")]
    );
}

#[rstest]
fn removed_rule_no_longer_applies(mut normalizer: ResultNormalizer) {
    assert!(normalizer.remove_normalization_rule("pylint").is_some());
    assert!(normalizer.remove_normalization_rule("pylint").is_none());

    let raw = RawToolResult::success("pylint").with_issue(RawIssue::new("convention", "C0301"));
    let issue_severity = first_issue(&normalizer.normalize_result(&raw)).severity();
    assert_eq!(issue_severity, Severity::Info);
}

#[rstest]
#[case::current_dir("./src/app.ts", "src/app.ts")]
#[case::parent_segment("src/lib/../app.ts", "src/app.ts")]
#[case::nested_current("src/./lib/./a.ts", "src/lib/a.ts")]
#[case::leading_parent("../shared/a.ts", "../shared/a.ts")]
#[case::absolute("/srv/app/../lib/a.ts", "/srv/lib/a.ts")]
#[case::collapses_to_nothing("src/..", ".")]
fn paths_are_normalised(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(normalize_path(input), expected);
}

#[rstest]
fn metrics_are_recomputed(normalizer: ResultNormalizer) {
    let raw = RawToolResult::new("ruff", ToolStatus::Warning)
        .with_issue(RawIssue::new("error", "E999").with_file("./a.py"))
        .with_issue(RawIssue::new("warning", "W291").with_file("a.py").fixable())
        .with_issue(RawIssue::new("info", "I001").with_file("b.py").fixable())
        .with_metric("files_scanned", 2.0)
        .with_execution_time(Duration::from_millis(30));
    let normalized = normalizer.normalize_result(&raw);
    let metrics = normalized.metrics();

    assert_eq!(normalized.status(), ToolStatus::Warning);
    assert_eq!(metrics.issues_count(), 3);
    assert_eq!(metrics.error_count(), 1);
    assert_eq!(metrics.warning_count(), 1);
    assert_eq!(metrics.info_count(), 1);
    assert_eq!(metrics.fixable_count(), 2);
    assert_eq!(metrics.files_affected(), 2);
    assert!((29.9..=30.1).contains(&metrics.execution_time_ms()));
    assert_eq!(normalized.tool_metrics().get("files_scanned"), Some(&2.0));
}

#[rstest]
fn malformed_result_degrades_to_error(normalizer: ResultNormalizer) {
    let raw = RawToolResult::success("ruff").with_metric("files", -1.0);
    let normalized = normalizer.normalize_result(&raw);

    assert_eq!(normalized.tool(), "ruff");
    assert_eq!(normalized.status(), ToolStatus::Error);
    assert_eq!(normalized.metrics().error_count(), 1);
    assert!(first_issue(&normalized).message().contains("malformed tool result"));
    assert!(normalized.tool_metrics().is_empty());
}

#[rstest]
#[case::unknown_status(json!({ "tool": "jest", "status": "exploded" }), "jest")]
#[case::missing_status(json!({ "tool": "jest" }), "jest")]
#[case::issues_not_a_list(json!({ "tool": "jest", "status": "success", "issues": 3 }), "jest")]
#[case::no_tool(json!({ "status": "success" }), UNKNOWN_TOOL)]
#[case::not_an_object(json!("garbage"), UNKNOWN_TOOL)]
fn undecodable_values_degrade(
    normalizer: ResultNormalizer,
    #[case] value: Value,
    #[case] expected_tool: &str,
) {
    let normalized = normalizer.normalize_value(&value);
    assert_eq!(normalized.tool(), expected_tool);
    assert_eq!(normalized.status(), ToolStatus::Error);
}

#[rstest]
fn well_formed_values_are_normalised(normalizer: ResultNormalizer) {
    let value = json!({
        "tool": "pylint",
        "status": "success",
        "issues": [{ "type": "convention", "message": "C0114", "file": "./m.py" }]
    });
    let normalized = normalizer.normalize_value(&value);
    let issue = first_issue(&normalized);
    assert_eq!(issue.severity(), Severity::Warning);
    assert_eq!(issue.file(), Some("m.py"));
}

#[rstest]
fn batch_preserves_order(normalizer: ResultNormalizer) {
    let batch = [
        RawToolResult::success("tsc"),
        RawToolResult::failure("jest", "timed out"),
    ];
    let tools: Vec<_> = normalizer
        .normalize_results(&batch)
        .iter()
        .map(|result| result.tool().to_owned())
        .collect();
    assert_eq!(tools, ["tsc", "jest"]);
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

#[rstest]
fn merge_concatenates_and_sums(normalizer: ResultNormalizer) {
    let first = normalizer.normalize_result(
        &RawToolResult::success("eslint")
            .with_issue(RawIssue::new("error", "no-undef").with_file("a.js"))
            .with_metric("files_scanned", 3.0)
            .with_execution_time(Duration::from_millis(10)),
    );
    let second = normalizer.normalize_result(
        &RawToolResult::new("tsc", ToolStatus::Error)
            .with_issue(RawIssue::new("error", "TS2304").with_file("a.js"))
            .with_issue(RawIssue::new("warning", "TS6133").with_file("b.ts"))
            .with_metric("files_scanned", 4.0)
            .with_execution_time(Duration::from_millis(20)),
    );

    let merged = merge_normalized_results(&[first.clone(), second.clone()]);

    assert_eq!(merged.tool(), MERGED_TOOL);
    assert_eq!(
        merged.issues().len(),
        first.issues().len() + second.issues().len()
    );
    assert_eq!(merged.metrics().issues_count(), 3);
    assert_eq!(merged.metrics().error_count(), 2);
    assert_eq!(merged.metrics().files_affected(), 2);
    assert_eq!(merged.status(), ToolStatus::Error);
    assert!((29.9..=30.1).contains(&merged.metrics().execution_time_ms()));
    assert_eq!(merged.tool_metrics().get("files_scanned"), Some(&7.0));
}

#[test]
fn merging_empty_results_is_empty() {
    let empty = NormalizedResult::empty("eslint");
    let merged = merge_normalized_results(&[empty.clone(), empty]);

    assert!(merged.issues().is_empty());
    assert_eq!(merged.metrics(), &NormalizedMetrics::default());
    assert_eq!(merged.status(), ToolStatus::Success);
}

#[test]
fn merging_nothing_yields_named_empty_result() {
    assert_eq!(
        merge_normalized_results(&[]),
        NormalizedResult::empty(MERGED_TOOL)
    );
}
