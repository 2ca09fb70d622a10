//! Observability and telemetry.

mod logging;
mod metrics;

pub use logging::{LOG_ENV, LOG_FORMAT_ENV, LogFormat, LoggingConfig};
pub use metrics::{METRICS_ENABLED_ENV, MetricsConfig, install_prometheus};

use crate::config::RuntimeSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Full observability configuration.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl ObservabilityConfig {
    /// Builds configuration from runtime settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self {
            logging: LoggingConfig::from_settings(&settings.logging),
            metrics: MetricsConfig::from_settings(&settings.metrics),
        }
    }
}

/// Handle for observability runtime components.
#[derive(Debug)]
pub struct ObservabilityHandle {
    metrics_handle: Option<PrometheusHandle>,
}

impl ObservabilityHandle {
    /// Renders the Prometheus exposition text, if metrics are enabled.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics_handle.as_ref().map(PrometheusHandle::render)
    }
}

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initializes logging and metrics for the process.
///
/// # Errors
///
/// Returns an error if observability has already been initialized, the
/// filter directive is invalid, or the log file cannot be opened.
pub fn init(config: ObservabilityConfig) -> Result<ObservabilityHandle> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "observability already initialized".to_string(),
        });
    }

    let filter = EnvFilter::try_new(&config.logging.directive).map_err(|e| {
        Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: format!("invalid log filter '{}': {e}", config.logging.directive),
        }
    })?;

    let metrics_handle = install_prometheus(&config.metrics)?;

    let fmt_layer: BoxedLayer = match (&config.logging.file, config.logging.format) {
        (Some(log_file), LogFormat::Json) => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(open_log_file(log_file)?)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        (Some(log_file), LogFormat::Pretty) => tracing_subscriber::fmt::layer()
            .with_writer(open_log_file(log_file)?)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        (None, LogFormat::Json) => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        (None, LogFormat::Pretty) => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .map_err(init_error)?;

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "failed to mark observability initialized".to_string(),
        })?;

    Ok(ObservabilityHandle { metrics_handle })
}

/// Initializes observability from runtime settings with env overrides.
///
/// # Errors
///
/// Same as [`init`].
pub fn init_from_settings(settings: &RuntimeSettings) -> Result<ObservabilityHandle> {
    init(ObservabilityConfig::from_settings(settings))
}

/// Thread-safe file writer for logging.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Opens a log file for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_log_dir".to_string(),
            cause: e.to_string(),
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::OperationFailed {
            operation: "open_log_file".to_string(),
            cause: format!("{}: {}", path.display(), e),
        })?;

    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_writer_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("attachkit.log");

        let mut writer = open_log_file(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        let mut second = open_log_file(&path).unwrap();
        second.write_all(b"second\n").unwrap();
        second.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = RuntimeSettings::from_toml_str("[logging]\nfile = \"/tmp/x.log\"").unwrap();
        let config = ObservabilityConfig::from_settings(&settings);
        assert_eq!(config.logging.file.as_deref(), Some(Path::new("/tmp/x.log")));
    }
}
