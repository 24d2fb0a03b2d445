//! Logging for FinPulse.
//!
//! [`init_telemetry`] installs the global subscriber used by the `finpulse`
//! binary: `RUST_LOG` wins when set, otherwise the configured default level
//! applies. [`EventCapture`] records events in memory so tests can assert on
//! what was logged.

pub mod memory;

pub use memory::{CapturedEvent, EventCapture};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Output format for log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, one line per event.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `finpulse_report=debug`.
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { default_filter: "info".to_string(), format: LogFormat::Pretty }
    }
}

impl TelemetryConfig {
    /// `debug` when `verbose`, else `info`.
    pub fn from_verbosity(verbose: bool) -> Self {
        let default_filter = if verbose { "debug" } else { "info" };
        Self { default_filter: default_filter.to_string(), ..Self::default() }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Resolve the filter: `RUST_LOG` when set and valid, else `default_filter`.
pub fn build_filter(default_filter: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: default_filter.to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber. Logs go to stderr so report output on
/// stdout stays machine-readable.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(&config.default_filter)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
        }
    };
    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_picks_default_level() {
        assert_eq!(TelemetryConfig::from_verbosity(true).default_filter, "debug");
        assert_eq!(TelemetryConfig::from_verbosity(false).default_filter, "info");
        assert_eq!(TelemetryConfig::default().format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_malformed_default_filter() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter("finpulse=verbose").is_err());
            assert!(build_filter("finpulse_report=debug,info").is_ok());
        }
    }
}
