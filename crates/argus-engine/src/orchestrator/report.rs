//! The aggregate produced by a completed run.

use std::time::Duration;

use argus_plugins::{ExecutionPlan, ToolStatus};
use serde::{Deserialize, Serialize};

use crate::normalizer::NormalizedResult;

const SCORE_CEILING_HALVES: u64 = 200;
const ERROR_PENALTY_HALVES: u64 = 10;
const WARNING_PENALTY_HALVES: u64 = 4;
const INFO_PENALTY_HALVES: u64 = 1;
const FAILED_TOOL_PENALTY_HALVES: u64 = 20;

/// Totals across every tool of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    total_issues: usize,
    total_errors: usize,
    total_warnings: usize,
    total_fixable: usize,
}

impl AnalysisSummary {
    /// Sums the metrics of `results`.
    #[must_use]
    pub fn from_results(results: &[NormalizedResult]) -> Self {
        results.iter().fold(Self::default(), |summary, result| {
            let metrics = result.metrics();
            Self {
                total_issues: summary.total_issues.saturating_add(metrics.issues_count()),
                total_errors: summary.total_errors.saturating_add(metrics.error_count()),
                total_warnings: summary
                    .total_warnings
                    .saturating_add(metrics.warning_count()),
                total_fixable: summary
                    .total_fixable
                    .saturating_add(metrics.fixable_count()),
            }
        })
    }

    /// Issues of every severity.
    #[must_use]
    pub const fn total_issues(&self) -> usize {
        self.total_issues
    }

    /// Error-severity issues.
    #[must_use]
    pub const fn total_errors(&self) -> usize {
        self.total_errors
    }

    /// Warning-severity issues.
    #[must_use]
    pub const fn total_warnings(&self) -> usize {
        self.total_warnings
    }

    /// Automatically fixable issues.
    #[must_use]
    pub const fn total_fixable(&self) -> usize {
        self.total_fixable
    }
}

/// Scores a run on a 0 to 100 scale.
///
/// Starting from 100, each error costs 5, each warning 2 and each
/// informational issue 0.5; every tool whose status is
/// [`ToolStatus::Error`] costs a further 10. The score never drops below 0.
///
/// # Examples
///
/// ```
/// use argus_engine::{NormalizedResult, overall_score};
///
/// assert_eq!(overall_score(&[NormalizedResult::empty("tsc")]), 100.0);
/// ```
#[must_use]
pub fn overall_score(results: &[NormalizedResult]) -> f64 {
    let penalty = results.iter().fold(0_u64, |total, result| {
        let metrics = result.metrics();
        let failed = if result.status() == ToolStatus::Error {
            FAILED_TOOL_PENALTY_HALVES
        } else {
            0
        };
        total
            .saturating_add(weighted(metrics.error_count(), ERROR_PENALTY_HALVES))
            .saturating_add(weighted(metrics.warning_count(), WARNING_PENALTY_HALVES))
            .saturating_add(weighted(metrics.info_count(), INFO_PENALTY_HALVES))
            .saturating_add(failed)
    });
    halves_to_score(SCORE_CEILING_HALVES.saturating_sub(penalty))
}

fn weighted(count: usize, halves: u64) -> u64 {
    u64::try_from(count)
        .unwrap_or(u64::MAX)
        .saturating_mul(halves)
}

#[expect(
    clippy::float_arithmetic,
    reason = "informational issues cost half a point"
)]
fn halves_to_score(halves: u64) -> f64 {
    let bounded = u32::try_from(halves.min(SCORE_CEILING_HALVES)).unwrap_or(0);
    f64::from(bounded) * 0.5
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    project_id: String,
    tool_results: Vec<NormalizedResult>,
    summary: AnalysisSummary,
    overall_score: f64,
    plan: ExecutionPlan,
    duration: Duration,
}

impl AnalysisResult {
    /// Assembles the result of a run, deriving the summary and score.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        tool_results: Vec<NormalizedResult>,
        plan: ExecutionPlan,
        duration: Duration,
    ) -> Self {
        let summary = AnalysisSummary::from_results(&tool_results);
        let overall_score = overall_score(&tool_results);
        Self {
            project_id: project_id.into(),
            tool_results,
            summary,
            overall_score,
            plan,
            duration,
        }
    }

    /// Caller-supplied project identifier.
    #[must_use]
    pub const fn project_id(&self) -> &str {
        self.project_id.as_str()
    }

    /// One normalised result per requested plugin, in plan order.
    #[must_use]
    pub fn tool_results(&self) -> &[NormalizedResult] {
        &self.tool_results
    }

    /// Result for the named tool, if present.
    #[must_use]
    pub fn tool_result(&self, tool: &str) -> Option<&NormalizedResult> {
        self.tool_results.iter().find(|result| result.tool() == tool)
    }

    /// Totals across all tools.
    #[must_use]
    pub const fn summary(&self) -> &AnalysisSummary {
        &self.summary
    }

    /// Score between 0 and 100.
    #[must_use]
    pub const fn overall_score(&self) -> f64 {
        self.overall_score
    }

    /// The plan the run followed.
    #[must_use]
    pub const fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns `true` when any tool reported [`ToolStatus::Error`].
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.tool_results
            .iter()
            .any(|result| result.status() == ToolStatus::Error)
    }
}
