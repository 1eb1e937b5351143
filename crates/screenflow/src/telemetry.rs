use crate::config::TelemetryConfig;
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{value}'")]
    InvalidFilter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("failed to install tracing subscriber")]
    Install(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Installs the global tracing subscriber.
///
/// A `RUST_LOG` value in the environment takes precedence over the configured
/// default, so verbosity can be raised per-invocation without touching config.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| fallback_filter(&config.log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Install)
}

fn fallback_filter(configured: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(configured).map_err(|source| TelemetryError::InvalidFilter {
        value: configured.to_string(),
        source,
    })
}
