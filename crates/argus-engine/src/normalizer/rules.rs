//! Canonical severities and per-tool mapping rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Canonical severity of a normalised issue.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum Severity {
    /// Must be fixed.
    Error,
    /// Should be looked at.
    Warning,
    /// Informational or stylistic.
    Info,
}

impl Severity {
    /// Maps a tool's severity label through the shared vocabulary.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Labels outside the vocabulary map to [`Severity::Warning`].
    ///
    /// # Examples
    ///
    /// ```
    /// use argus_engine::Severity;
    ///
    /// assert_eq!(Severity::from_label("FATAL"), Severity::Error);
    /// assert_eq!(Severity::from_label("convention"), Severity::Info);
    /// assert_eq!(Severity::from_label("spooky"), Severity::Warning);
    /// ```
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "error" | "fatal" | "critical" | "blocker" | "high" | "e" => Self::Error,
            "info" | "information" | "note" | "hint" | "low" | "minor" | "style"
            | "convention" | "refactor" | "i" => Self::Info,
            _ => Self::Warning,
        }
    }
}

/// Per-tool overrides applied before the shared vocabulary.
///
/// Severity labels are matched case-insensitively. Categories are resolved
/// from the issue's rule identifier first, then the tool-wide category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationRule {
    #[serde(default)]
    severities: BTreeMap<String, Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default)]
    rule_categories: BTreeMap<String, String>,
}

impl NormalizationRule {
    /// Creates a rule with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a tool severity label onto a canonical severity.
    #[must_use]
    pub fn map_severity(mut self, label: &str, severity: Severity) -> Self {
        self.severities
            .insert(label.trim().to_ascii_lowercase(), severity);
        self
    }

    /// Category for every issue of the tool without a more specific match.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Category for issues reported under a specific rule identifier.
    #[must_use]
    pub fn categorise_rule(mut self, rule: impl Into<String>, category: impl Into<String>) -> Self {
        self.rule_categories.insert(rule.into(), category.into());
        self
    }

    /// Severity mapped for `label`, if this rule overrides it.
    #[must_use]
    pub fn severity_for(&self, label: &str) -> Option<Severity> {
        self.severities
            .get(&label.trim().to_ascii_lowercase())
            .copied()
    }

    /// Category for an issue carrying the given rule identifier.
    #[must_use]
    pub fn category_for(&self, rule: Option<&str>) -> Option<&str> {
        rule.and_then(|id| self.rule_categories.get(id))
            .or(self.category.as_ref())
            .map(String::as_str)
    }
}
