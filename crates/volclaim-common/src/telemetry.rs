//! Logging initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! JSON formatter (for log shippers) or a compact human formatter.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,volclaim=debug,kube=info,tower=warn,hyper=warn";

/// Errors that can occur during telemetry initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize tracing subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    /// Unknown log format name
    #[error("unknown log format '{0}', expected 'json' or 'text'")]
    UnknownFormat(String),
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Structured JSON, one object per line
    Json,
    /// Compact human-readable output
    #[default]
    Text,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" | "compact" => Ok(LogFormat::Text),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

/// Configuration for telemetry initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log line format
    pub format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

/// Initialize the global tracing subscriber
///
/// Log lines go to stderr. `RUST_LOG` takes precedence over
/// `config.default_filter`. Fails if a global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}
