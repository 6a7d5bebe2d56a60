//! Canonical result shapes produced by the normaliser.

use std::collections::{BTreeMap, BTreeSet};

use argus_plugins::ToolStatus;
use serde::{Deserialize, Serialize};

use super::rules::Severity;

/// Category assigned when no rule applies.
pub const DEFAULT_CATEGORY: &str = "general";

/// A finding expressed in the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedIssue {
    pub(crate) tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) column: Option<u32>,
    pub(crate) message: String,
    pub(crate) severity: Severity,
    pub(crate) category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) rule: Option<String>,
    #[serde(default)]
    pub(crate) fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) suggestion: Option<String>,
}

impl NormalizedIssue {
    /// Tool that reported the issue.
    #[must_use]
    pub const fn tool(&self) -> &str {
        self.tool.as_str()
    }

    /// Normalised file path, if any.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Line number, if reported.
    #[must_use]
    pub const fn line(&self) -> Option<u32> {
        self.line
    }

    /// Column number, if reported.
    #[must_use]
    pub const fn column(&self) -> Option<u32> {
        self.column
    }

    /// Human-readable message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Canonical severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Category, `"general"` unless a rule assigned one.
    #[must_use]
    pub const fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Tool rule identifier, if reported.
    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref()
    }

    /// Whether the tool can fix the issue.
    #[must_use]
    pub const fn is_fixable(&self) -> bool {
        self.fixable
    }

    /// Suggested remedy, if reported.
    #[must_use]
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }
}

/// Aggregate counts recomputed from a normalised issue list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    issues_count: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    fixable_count: usize,
    files_affected: usize,
    execution_time_ms: f64,
}

impl NormalizedMetrics {
    /// Counts `issues` and records `execution_time_ms`.
    #[must_use]
    pub fn from_issues(issues: &[NormalizedIssue], execution_time_ms: f64) -> Self {
        let count = |severity: Severity| {
            issues
                .iter()
                .filter(|issue| issue.severity == severity)
                .count()
        };
        let files: BTreeSet<&str> = issues.iter().filter_map(NormalizedIssue::file).collect();
        Self {
            issues_count: issues.len(),
            error_count: count(Severity::Error),
            warning_count: count(Severity::Warning),
            info_count: count(Severity::Info),
            fixable_count: issues.iter().filter(|issue| issue.fixable).count(),
            files_affected: files.len(),
            execution_time_ms,
        }
    }

    /// Total number of issues.
    #[must_use]
    pub const fn issues_count(&self) -> usize {
        self.issues_count
    }

    /// Issues with [`Severity::Error`].
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.error_count
    }

    /// Issues with [`Severity::Warning`].
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Issues with [`Severity::Info`].
    #[must_use]
    pub const fn info_count(&self) -> usize {
        self.info_count
    }

    /// Issues the tool can fix automatically.
    #[must_use]
    pub const fn fixable_count(&self) -> usize {
        self.fixable_count
    }

    /// Distinct files with at least one issue.
    #[must_use]
    pub const fn files_affected(&self) -> usize {
        self.files_affected
    }

    /// Wall-clock execution time in milliseconds.
    #[must_use]
    pub const fn execution_time_ms(&self) -> f64 {
        self.execution_time_ms
    }
}

/// One tool's output in the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    tool: String,
    status: ToolStatus,
    issues: Vec<NormalizedIssue>,
    metrics: NormalizedMetrics,
    #[serde(default)]
    tool_metrics: BTreeMap<String, f64>,
}

impl NormalizedResult {
    pub(crate) fn new(
        tool: impl Into<String>,
        status: ToolStatus,
        issues: Vec<NormalizedIssue>,
        execution_time_ms: f64,
        tool_metrics: BTreeMap<String, f64>,
    ) -> Self {
        let metrics = NormalizedMetrics::from_issues(&issues, execution_time_ms);
        Self {
            tool: tool.into(),
            status,
            issues,
            metrics,
            tool_metrics,
        }
    }

    /// A successful result with no issues and zeroed metrics.
    #[must_use]
    pub fn empty(tool: impl Into<String>) -> Self {
        Self::new(tool, ToolStatus::Success, Vec::new(), 0.0, BTreeMap::new())
    }

    /// Tool name.
    #[must_use]
    pub const fn tool(&self) -> &str {
        self.tool.as_str()
    }

    /// Tool status.
    #[must_use]
    pub const fn status(&self) -> ToolStatus {
        self.status
    }

    /// Normalised issues.
    #[must_use]
    pub fn issues(&self) -> &[NormalizedIssue] {
        &self.issues
    }

    /// Aggregate counts.
    #[must_use]
    pub const fn metrics(&self) -> &NormalizedMetrics {
        &self.metrics
    }

    /// Tool-specific metrics carried over from the raw result.
    #[must_use]
    pub const fn tool_metrics(&self) -> &BTreeMap<String, f64> {
        &self.tool_metrics
    }

    pub(crate) fn into_parts(self) -> (ToolStatus, Vec<NormalizedIssue>, f64, BTreeMap<String, f64>) {
        (
            self.status,
            self.issues,
            self.metrics.execution_time_ms,
            self.tool_metrics,
        )
    }
}
