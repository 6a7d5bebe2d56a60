//! Unit tests for configuration defaults, parsing, and validation.

use std::str::FromStr;
use std::time::Duration;

use rstest::rstest;

use super::*;

#[test]
fn defaults_are_valid() {
    let config = OrchestratorConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.default_timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    assert_eq!(config.retry().max_retries(), DEFAULT_MAX_RETRIES);
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(config.log_format(), LogFormat::Json);
    assert!(config.log_format().is_structured());
    assert!(!config.log_span_timings());
    assert!(config.sandbox().working_root().is_none());
}

#[test]
fn span_timings_can_be_enabled_from_a_document() {
    let json = r#"{ "log_format": "compact", "log_span_timings": true }"#;
    let config: OrchestratorConfig = serde_json::from_str(json).expect("parse config");
    assert!(config.log_span_timings());
    assert!(!config.log_format().is_structured());
}

#[test]
fn partial_document_fills_defaults() {
    let json = r#"{ "default_timeout_ms": 1000, "sandbox": { "sample_interval_ms": 20 } }"#;
    let config: OrchestratorConfig = serde_json::from_str(json).expect("parse config");
    assert_eq!(config.default_timeout(), Duration::from_millis(1000));
    assert_eq!(config.sandbox().sample_interval(), Duration::from_millis(20));
    assert_eq!(
        config.sandbox().memory_ceiling_bytes(),
        DEFAULT_MEMORY_CEILING_BYTES
    );
    assert_eq!(config.retry(), &RetryPolicy::default());
}

#[test]
fn working_root_round_trips_through_serde() {
    let json = r#"{ "sandbox": { "working_root": "/srv/projects" } }"#;
    let config: OrchestratorConfig = serde_json::from_str(json).expect("parse config");
    assert_eq!(
        config.sandbox().working_root().map(|root| root.as_str()),
        Some("/srv/projects")
    );
}

#[rstest]
#[case::timeout(OrchestratorConfig::new().with_default_timeout_ms(0), "default_timeout_ms")]
#[case::interval(
    OrchestratorConfig::new().with_sandbox(SandboxLimits::new().with_sample_interval_ms(0)),
    "sandbox.sample_interval_ms"
)]
#[case::cache_key(
    OrchestratorConfig::new().with_sandbox(SandboxLimits::new().with_max_cache_key_len(0)),
    "sandbox.max_cache_key_len"
)]
#[case::multiplier(
    OrchestratorConfig::new().with_retry(RetryPolicy::default().with_multiplier(0)),
    "retry.backoff_multiplier"
)]
fn zero_values_are_rejected(#[case] config: OrchestratorConfig, #[case] field: &str) {
    let err = config.validate().expect_err("zero value should be rejected");
    assert!(
        matches!(err, ConfigError::ZeroValue { field: reported } if reported == field),
        "unexpected error: {err:?}"
    );
    assert!(err.to_string().contains(field));
}

#[test]
fn zero_sample_interval_is_rejected_on_limits_alone() {
    let limits = SandboxLimits::new().with_sample_interval_ms(0);
    assert_eq!(
        limits.validate(),
        Err(ConfigError::ZeroValue {
            field: "sandbox.sample_interval_ms"
        })
    );
    assert_eq!(limits.sample_interval(), Duration::from_millis(1));
    assert!(SandboxLimits::default().validate().is_ok());
}

#[test]
fn blank_log_filter_is_rejected() {
    let config = OrchestratorConfig::new().with_log_filter("   ");
    assert_eq!(config.validate(), Err(ConfigError::EmptyLogFilter));
}

#[rstest]
#[case::first(1, 100)]
#[case::second(2, 200)]
#[case::third(3, 400)]
#[case::capped(10, 1_000)]
fn backoff_grows_exponentially_up_to_ceiling(#[case] retry: u32, #[case] expected_ms: u64) {
    let policy = RetryPolicy::new(10, 100).with_max_backoff_ms(1_000);
    assert_eq!(policy.backoff_for(retry), Duration::from_millis(expected_ms));
}

#[test]
fn backoff_for_zeroth_retry_is_immediate() {
    assert_eq!(RetryPolicy::default().backoff_for(0), Duration::ZERO);
}

#[test]
fn backoff_saturates_instead_of_overflowing() {
    let policy = RetryPolicy::new(100, u64::MAX).with_max_backoff_ms(u64::MAX);
    assert_eq!(policy.backoff_for(64), Duration::from_millis(u64::MAX));
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("COMPACT", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] input: &str, #[case] expected: LogFormat) {
    assert_eq!(LogFormat::from_str(input).expect("parse format"), expected);
}

#[test]
fn log_format_rejects_unknown_values() {
    assert!(LogFormat::from_str("yaml").is_err());
}
