//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Environment variable overriding `[metrics] enabled`.
pub const METRICS_ENABLED_ENV: &str = "ATTACHKIT_METRICS_ENABLED";

/// Metrics configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,
}

impl MetricsConfig {
    /// Builds metrics configuration from settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: &MetricsSettings) -> Self {
        let mut config = Self {
            enabled: settings.enabled,
        };
        if let Some(enabled) = parse_bool_env(METRICS_ENABLED_ENV) {
            config.enabled = enabled;
        }
        config
    }
}

/// Installs the Prometheus recorder as the global metrics recorder.
///
/// Returns `None` when metrics are disabled. The handle renders the
/// exposition text on demand; no listener is started.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if a global recorder is already set.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })?;
    Ok(Some(handle))
}

fn parse_bool_env(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        let value = value.to_lowercase();
        value == "true" || value == "1" || value == "yes"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{StorageExtension, StorageExtensionRegistry};

    #[test]
    fn test_disabled_installs_nothing() {
        let handle = install_prometheus(&MetricsConfig { enabled: false }).unwrap();
        assert!(handle.is_none());
    }

    #[test]
    fn test_registration_counter_recorded() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let registry = StorageExtensionRegistry::new();
            registry.register("counted", StorageExtension::new()).unwrap();
        });

        let rendered = handle.render();
        assert!(rendered.contains("storage_extension_registered_total"));
    }
}
