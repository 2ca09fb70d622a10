//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Environment variable overriding the filter directive.
pub const LOG_ENV: &str = "ATTACHKIT_LOG";
/// Environment variable overriding the output format.
pub const LOG_FORMAT_ENV: &str = "ATTACHKIT_LOG_FORMAT";

const DEFAULT_DIRECTIVE: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name. Unknown names fall back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    pub directive: String,
    /// Output format.
    pub format: LogFormat,
    /// Append-only log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directive: DEFAULT_DIRECTIVE.to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    fn resolve(settings: &LoggingSettings, env: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |value: String| {
            let value = value.trim().to_string();
            (!value.is_empty()).then_some(value)
        };

        let directive = env(LOG_ENV)
            .and_then(non_empty)
            .or_else(|| settings.level.clone().and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string());
        let format = env(LOG_FORMAT_ENV)
            .or_else(|| settings.format.clone())
            .map_or_else(LogFormat::default, |value| LogFormat::parse(&value));

        Self {
            directive,
            format,
            file: settings.file.clone(),
        }
    }
}
