//! Structured logging setup.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    Json,
    /// Human-readable format (for development).
    #[default]
    Human,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Human => write!(f, "human"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "human" | "text" | "pretty" => Ok(Self::Human),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Errors from logging setup.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Build the env filter: `RUST_LOG` if set, otherwise `default_filter`.
pub fn env_filter(default_filter: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| LoggingError::Filter {
            filter: default_filter.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Install the global `tracing` subscriber, writing to stderr.
pub fn init_tracing(format: LogFormat, default_filter: &str) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter)?)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Human => builder.compact().try_init(),
    };

    result.map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}
