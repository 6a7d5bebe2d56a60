//! Maps heterogeneous tool output onto the canonical result schema.
//!
//! Each tool speaks its own severity vocabulary (`fatal`, `convention`,
//! `E`, ...). The [`ResultNormalizer`] folds those onto
//! [`Severity::Error`], [`Severity::Warning`] and [`Severity::Info`],
//! consulting a per-tool [`NormalizationRule`] before the shared
//! vocabulary, and recomputes aggregate metrics from the mapped issues.
//! Malformed input never fails: it degrades to an error-status result.

mod model;
mod rules;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};

use argus_plugins::path::normalize_lexically;
use argus_plugins::{RawIssue, RawToolResult, ToolStatus};
use camino::Utf8Path;
use serde_json::Value;
use tracing::warn;

pub use self::model::{DEFAULT_CATEGORY, NormalizedIssue, NormalizedMetrics, NormalizedResult};
pub use self::rules::{NormalizationRule, Severity};

const NORMALIZER_TARGET: &str = "argus_engine::normalizer";

/// Tool name given to merged results.
pub const MERGED_TOOL: &str = "merged";

/// Tool name used when malformed input does not identify its tool.
pub const UNKNOWN_TOOL: &str = "unknown";

/// Converts raw tool results into [`NormalizedResult`] values.
///
/// # Examples
///
/// ```
/// use argus_engine::{NormalizationRule, ResultNormalizer, Severity};
/// use argus_plugins::{RawIssue, RawToolResult};
///
/// let mut normalizer = ResultNormalizer::new();
/// normalizer.add_rule(
///     "pylint",
///     NormalizationRule::new()
///         .map_severity("convention", Severity::Warning)
///         .with_category("style"),
/// );
///
/// let raw = RawToolResult::success("pylint")
///     .with_issue(RawIssue::new("convention", "line too long").with_file("./pkg/../app.py"));
/// let normalized = normalizer.normalize_result(&raw);
///
/// let issue = &normalized.issues()[0];
/// assert_eq!(issue.severity(), Severity::Warning);
/// assert_eq!(issue.category(), "style");
/// assert_eq!(issue.file(), Some("app.py"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResultNormalizer {
    rules: HashMap<String, NormalizationRule>,
}

impl ResultNormalizer {
    /// Creates a normaliser with no per-tool rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the rule for `tool`, returning the rule it replaced.
    pub fn add_rule(
        &mut self,
        tool: impl Into<String>,
        rule: NormalizationRule,
    ) -> Option<NormalizationRule> {
        self.rules.insert(tool.into(), rule)
    }

    /// Removes the rule for `tool`, returning it when one was installed.
    pub fn remove_normalization_rule(&mut self, tool: &str) -> Option<NormalizationRule> {
        self.rules.remove(tool)
    }

    /// Rule installed for `tool`, if any.
    #[must_use]
    pub fn rule(&self, tool: &str) -> Option<&NormalizationRule> {
        self.rules.get(tool)
    }

    /// Normalises one raw result.
    ///
    /// A result that fails structural validation is not mapped: the output
    /// carries the tool name, status [`ToolStatus::Error`] and a single issue
    /// describing the defect.
    #[must_use]
    pub fn normalize_result(&self, raw: &RawToolResult) -> NormalizedResult {
        if let Err(error) = raw.validate() {
            warn!(
                target: NORMALIZER_TARGET,
                tool = raw.tool(),
                %error,
                "degrading malformed tool result"
            );
            let tool = if raw.tool().trim().is_empty() {
                UNKNOWN_TOOL
            } else {
                raw.tool()
            };
            return degraded(tool, &format!("malformed tool result: {error}"));
        }

        let rule = self.rules.get(raw.tool());
        let issues = raw
            .issues()
            .iter()
            .map(|issue| normalize_issue(raw.tool(), issue, rule))
            .collect();
        NormalizedResult::new(
            raw.tool(),
            raw.status(),
            issues,
            raw.execution_time_ms(),
            raw.metrics().clone(),
        )
    }

    /// Normalises a raw result that has not been deserialised yet.
    ///
    /// Input that does not deserialise as a raw tool result degrades to an
    /// error-status result named after its `tool` field when present.
    #[must_use]
    pub fn normalize_value(&self, value: &Value) -> NormalizedResult {
        match serde_json::from_value::<RawToolResult>(value.clone()) {
            Ok(raw) => self.normalize_result(&raw),
            Err(error) => {
                let tool = value
                    .get("tool")
                    .and_then(Value::as_str)
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(UNKNOWN_TOOL);
                warn!(
                    target: NORMALIZER_TARGET,
                    tool,
                    %error,
                    "degrading undecodable tool result"
                );
                degraded(tool, &format!("malformed tool result: {error}"))
            }
        }
    }

    /// Normalises each entry of `batch`, preserving order.
    #[must_use]
    pub fn normalize_results(&self, batch: &[RawToolResult]) -> Vec<NormalizedResult> {
        batch.iter().map(|raw| self.normalize_result(raw)).collect()
    }
}

/// Folds several normalised results into one project-level view.
///
/// Issues are concatenated in input order, the status is the worst input
/// status, execution times are summed, and counts are recomputed from the
/// combined issue list. Tool metrics with the same name are summed. An empty
/// batch yields [`NormalizedResult::empty`] named [`MERGED_TOOL`].
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "execution times and tool metrics are fractional"
)]
pub fn merge_normalized_results(batch: &[NormalizedResult]) -> NormalizedResult {
    let mut status = ToolStatus::Success;
    let mut issues = Vec::new();
    let mut execution_time_ms = 0.0;
    let mut tool_metrics: BTreeMap<String, f64> = BTreeMap::new();

    for result in batch.iter().cloned() {
        let (part_status, part_issues, part_time, part_metrics) = result.into_parts();
        status = status.max(part_status);
        issues.extend(part_issues);
        execution_time_ms += part_time;
        for (name, value) in part_metrics {
            *tool_metrics.entry(name).or_insert(0.0) += value;
        }
    }
    NormalizedResult::new(MERGED_TOOL, status, issues, execution_time_ms, tool_metrics)
}

fn normalize_issue(
    tool: &str,
    issue: &RawIssue,
    rule: Option<&NormalizationRule>,
) -> NormalizedIssue {
    let severity = rule
        .and_then(|mapping| mapping.severity_for(issue.severity()))
        .unwrap_or_else(|| Severity::from_label(issue.severity()));
    let category = rule
        .and_then(|mapping| mapping.category_for(issue.rule()))
        .unwrap_or(DEFAULT_CATEGORY);
    NormalizedIssue {
        tool: tool.to_owned(),
        file: issue.file().map(normalize_path),
        line: issue.line(),
        column: issue.column(),
        message: issue.message().to_owned(),
        severity,
        category: category.to_owned(),
        rule: issue.rule().map(str::to_owned),
        fixable: issue.is_fixable(),
        suggestion: issue.suggestion().map(str::to_owned),
    }
}

fn degraded(tool: &str, message: &str) -> NormalizedResult {
    let issue = NormalizedIssue {
        tool: tool.to_owned(),
        file: None,
        line: None,
        column: None,
        message: message.to_owned(),
        severity: Severity::Error,
        category: DEFAULT_CATEGORY.to_owned(),
        rule: None,
        fixable: false,
        suggestion: None,
    };
    NormalizedResult::new(tool, ToolStatus::Error, vec![issue], 0.0, BTreeMap::new())
}

/// Resolves `.` and `..` segments and strips a leading `./`.
///
/// Leading `..` segments of a relative path are kept; `..` directly under
/// the root is dropped. Backslashes are left untouched.
///
/// # Examples
///
/// ```
/// use argus_engine::normalize_path;
///
/// assert_eq!(normalize_path("./src/lib/../main.rs"), "src/main.rs");
/// assert_eq!(normalize_path("../shared/util.rs"), "../shared/util.rs");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let normalised = normalize_lexically(Utf8Path::new(path));
    if normalised.as_str().is_empty() {
        String::from(".")
    } else {
        normalised.into_string()
    }
}
