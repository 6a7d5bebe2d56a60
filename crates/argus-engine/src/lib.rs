//! Orchestration and result normalisation for Argus analyzer plugins.
//!
//! The [`AnalysisEngine`] registers plugins, turns a request into an
//! execution plan, runs each parallel group inside the sandbox, and folds
//! the raw per-tool output into an [`AnalysisResult`] through the
//! [`ResultNormalizer`]. Configuration-time problems (unknown plugins,
//! invalid dependency graphs) fail a run before anything executes;
//! execution-time problems are reported per plugin and never abort the run.
//!
//! [`telemetry::initialise`] installs a `tracing` subscriber configured from
//! the same [`argus_config::OrchestratorConfig`].

mod error;
mod normalizer;
mod orchestrator;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use self::error::EngineError;
pub use self::normalizer::{
    DEFAULT_CATEGORY, MERGED_TOOL, NormalizationRule, NormalizedIssue, NormalizedMetrics,
    NormalizedResult, ResultNormalizer, Severity, UNKNOWN_TOOL, merge_normalized_results,
    normalize_path,
};
pub use self::orchestrator::{
    AnalysisEngine, AnalysisOptions, AnalysisResult, AnalysisSummary, RETRIES_METRIC,
    SKIPPED_METRIC, overall_score,
};
