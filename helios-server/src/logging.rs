//! Logging subsystem configuration.
//!
//! Mirrors `helios_agent::logging`: the server always logs to stdout,
//! configurable for level and rendering format via the same YAML document as
//! the rest of [`crate::config::InferenceConfig`].

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level to emit; also overridable via `RUST_LOG`.
    pub level: LoggingLevel,
    /// Output rendering.
    pub format: LoggingFormat,
    /// Use ANSI color escapes.
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LoggingLevel::Info,
            format: LoggingFormat::Full,
            color: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFormat {
    #[default]
    Full,
    Compact,
    Pretty,
    Json,
}

impl LoggingConfig {
    /// Install a global `tracing` subscriber built from this configuration.
    ///
    /// `RUST_LOG`, when set, takes precedence over `level`.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(self.color);
        match self.format {
            LoggingFormat::Full => builder.init(),
            LoggingFormat::Compact => builder.compact().init(),
            LoggingFormat::Pretty => builder.pretty().init(),
            LoggingFormat::Json => builder.json().init(),
        }
    }
}
