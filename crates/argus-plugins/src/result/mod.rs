//! Raw per-plugin results as produced by analyzer adapters.
//!
//! A [`RawToolResult`] carries the tool's own severity vocabulary untouched;
//! mapping it onto the canonical schema is the normaliser's job. Exactly one
//! raw result exists per plugin per run, synthesised by the sandbox when the
//! plugin itself could not produce one.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ResultShapeError;

/// Outcome status reported for a single tool.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ToolStatus {
    /// The tool ran to completion.
    #[default]
    Success,
    /// The tool ran but reported a degraded outcome.
    Warning,
    /// The tool failed or could not run.
    Error,
}

/// A single finding in the tool's own vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
    message: String,
    #[serde(default, rename = "type")]
    severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
    #[serde(default)]
    fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

impl RawIssue {
    /// Creates an issue with the tool's severity label and message.
    #[must_use]
    pub fn new(severity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: None,
            line: None,
            column: None,
            message: message.into(),
            severity: severity.into(),
            rule: None,
            fixable: false,
            suggestion: None,
        }
    }

    /// Attaches the file the issue was found in.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches a 1-based line number.
    #[must_use]
    pub const fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Attaches a 1-based column number.
    #[must_use]
    pub const fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    /// Attaches the tool's rule or code identifier.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Marks the issue as automatically fixable.
    #[must_use]
    pub const fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    /// Attaches a suggested remedy.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// File path as reported by the tool.
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

    /// Severity label in the tool's vocabulary.
    #[must_use]
    pub const fn severity(&self) -> &str {
        self.severity.as_str()
    }

    /// Rule or code identifier, if reported.
    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref()
    }

    /// Whether the tool can fix the issue automatically.
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

/// Output of one plugin for one run.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use argus_plugins::{RawIssue, RawToolResult, ToolStatus};
///
/// let result = RawToolResult::success("eslint")
///     .with_issue(RawIssue::new("error", "no-unused-vars").with_file("src/a.js"))
///     .with_metric("files_scanned", 12.0)
///     .with_execution_time(Duration::from_millis(40));
///
/// assert_eq!(result.status(), ToolStatus::Success);
/// assert_eq!(result.issues().len(), 1);
/// assert!(result.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToolResult {
    tool: String,
    status: ToolStatus,
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(default)]
    metrics: BTreeMap<String, f64>,
    #[serde(default)]
    execution_time_ms: f64,
}

impl RawToolResult {
    /// Creates an empty result with the given status.
    #[must_use]
    pub fn new(tool: impl Into<String>, status: ToolStatus) -> Self {
        Self {
            tool: tool.into(),
            status,
            issues: Vec::new(),
            metrics: BTreeMap::new(),
            execution_time_ms: 0.0,
        }
    }

    /// Creates an empty successful result.
    #[must_use]
    pub fn success(tool: impl Into<String>) -> Self {
        Self::new(tool, ToolStatus::Success)
    }

    /// Synthesises an error result carrying one issue that explains why.
    #[must_use]
    pub fn failure(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(tool, ToolStatus::Error).with_issue(RawIssue::new("error", message))
    }

    /// Overrides the status.
    #[must_use]
    pub const fn with_status(mut self, status: ToolStatus) -> Self {
        self.status = status;
        self
    }

    /// Appends an issue.
    #[must_use]
    pub fn with_issue(mut self, issue: RawIssue) -> Self {
        self.issues.push(issue);
        self
    }

    /// Appends several issues.
    #[must_use]
    pub fn with_issues(mut self, issues: impl IntoIterator<Item = RawIssue>) -> Self {
        self.issues.extend(issues);
        self
    }

    /// Records a named metric.
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Records the execution time.
    #[must_use]
    pub fn with_execution_time(mut self, elapsed: Duration) -> Self {
        self.set_execution_time(elapsed);
        self
    }

    /// Overwrites the execution time with a measured wall-clock duration.
    #[expect(
        clippy::float_arithmetic,
        reason = "execution time is reported in fractional milliseconds"
    )]
    pub fn set_execution_time(&mut self, elapsed: Duration) {
        self.execution_time_ms = elapsed.as_secs_f64() * 1_000.0;
    }

    /// Name of the tool that produced the result.
    #[must_use]
    pub const fn tool(&self) -> &str {
        self.tool.as_str()
    }

    /// Reported status.
    #[must_use]
    pub const fn status(&self) -> ToolStatus {
        self.status
    }

    /// Reported issues.
    #[must_use]
    pub fn issues(&self) -> &[RawIssue] {
        &self.issues
    }

    /// Reported metrics.
    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    /// Wall-clock execution time in milliseconds.
    #[must_use]
    pub const fn execution_time_ms(&self) -> f64 {
        self.execution_time_ms
    }

    /// Checks the structural invariants of the result.
    ///
    /// # Errors
    ///
    /// Returns a [`ResultShapeError`] when the tool name is blank, the
    /// execution time or any metric is negative or non-finite, or an issue
    /// has an empty message.
    pub fn validate(&self) -> Result<(), ResultShapeError> {
        if self.tool.trim().is_empty() {
            return Err(ResultShapeError::MissingToolName);
        }
        check_non_negative("execution_time_ms", self.execution_time_ms)?;
        for (name, value) in &self.metrics {
            check_non_negative(&format!("metrics.{name}"), *value)?;
        }
        if let Some(index) = self
            .issues
            .iter()
            .position(|issue| issue.message.trim().is_empty())
        {
            return Err(ResultShapeError::EmptyIssueMessage { index });
        }
        Ok(())
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), ResultShapeError> {
    if !value.is_finite() {
        return Err(ResultShapeError::NotFinite {
            field: field.to_owned(),
        });
    }
    if value < 0.0 {
        return Err(ResultShapeError::Negative {
            field: field.to_owned(),
            value,
        });
    }
    Ok(())
}
