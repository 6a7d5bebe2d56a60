//! Process-wide tracing setup for hosts embedding the engine.
//!
//! Events go to standard error. Every run opens an `analysis` span carrying
//! the `project` field, each parallel group a `group` span carrying its
//! index, and each sandboxed execution a `plugin` span carrying the plugin
//! name. JSON output attaches the current span and its ancestors to every
//! event so a single line can be traced back to its run, group and plugin.

use std::io::{self, IsTerminal};

use argus_config::OrchestratorConfig;
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, format::FmtSpan};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Proof that the global subscriber is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter is not valid `EnvFilter` syntax.
    #[error("invalid log filter '{filter}': {reason}")]
    Filter {
        /// The rejected filter expression.
        filter: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// Another subscriber already owns the global default.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global tracing subscriber described by `config`.
///
/// Only the first successful call installs anything; later calls return a
/// fresh [`TelemetryHandle`] and leave the global subscriber alone.
///
/// # Examples
///
/// ```rust
/// use argus_config::OrchestratorConfig;
/// use argus_engine::telemetry;
///
/// # fn main() -> Result<(), argus_engine::telemetry::TelemetryError> {
/// let config = OrchestratorConfig::default().with_log_span_timings(true);
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// drop((first, second));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter and
/// [`TelemetryError::Subscriber`] when another subscriber is already
/// installed.
pub fn initialise(config: &OrchestratorConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn span_events(config: &OrchestratorConfig) -> FmtSpan {
    if config.log_span_timings() {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

fn parse_filter(config: &OrchestratorConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: config.log_filter().to_owned(),
        reason: error.to_string(),
    })
}

fn install_subscriber(config: &OrchestratorConfig) -> Result<(), TelemetryError> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(parse_filter(config)?)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_span_events(span_events(config));

    let subscriber: Box<dyn Subscriber + Send + Sync> = if config.log_format().is_structured() {
        Box::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .finish(),
        )
    } else {
        Box::new(builder.compact().finish())
    };

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn unparsable_filter_names_the_expression() {
        let config = OrchestratorConfig::default().with_log_filter("argus=verbose");
        let err = parse_filter(&config).expect_err("filter must be rejected");
        assert!(
            matches!(&err, TelemetryError::Filter { filter, .. } if filter == "argus=verbose"),
            "unexpected error: {err:?}"
        );
        assert!(err.to_string().starts_with("invalid log filter 'argus=verbose'"));
    }

    #[rstest]
    #[case::disabled(false, FmtSpan::NONE)]
    #[case::enabled(true, FmtSpan::CLOSE)]
    fn span_timings_follow_configuration(#[case] enabled: bool, #[case] expected: FmtSpan) {
        let config = OrchestratorConfig::default().with_log_span_timings(enabled);
        assert_eq!(span_events(&config), expected);
    }
}
