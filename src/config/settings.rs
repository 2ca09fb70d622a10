//! TOML runtime settings.

use crate::models::{AttachInfo, AttachOptions, Value};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Runtime settings loaded from `config.toml`.
///
/// ```toml
/// [logging]
/// level = "attachkit=debug"
/// format = "json"
///
/// [metrics]
/// enabled = true
///
/// [[attach]]
/// name = "scratch"
/// path = ":memory:"
/// type = "memstore"
/// options = { cache_mb = 128, read_only = false }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Logging section.
    pub logging: LoggingSettings,
    /// Metrics section.
    pub metrics: MetricsSettings,
    /// Databases to attach at startup.
    #[serde(rename = "attach")]
    pub attachments: Vec<AttachDeclaration>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `attachkit=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Append-only log file.
    pub file: Option<PathBuf>,
}

/// `[metrics]` section.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Install the Prometheus recorder.
    pub enabled: bool,
}

/// One `[[attach]]` declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachDeclaration {
    /// Attach name.
    pub name: String,
    /// Database path.
    #[serde(default)]
    pub path: String,
    /// Storage extension type.
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Declarative options handed to the extension.
    #[serde(default)]
    pub options: HashMap<String, Value>,
}

impl AttachDeclaration {
    /// Splits the declaration into the attach inputs.
    ///
    /// Declared options become attach-info options; call-site options stay
    /// empty so nothing overrides them.
    #[must_use]
    pub fn to_attach_inputs(&self) -> (AttachInfo, AttachOptions) {
        let mut info = AttachInfo::new(self.name.clone(), self.path.clone());
        info.options.clone_from(&self.options);
        (info, AttachOptions::for_type(self.storage_type.clone()))
    }
}

impl RuntimeSettings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the text is not valid settings TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })
    }

    /// Loads settings from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads settings from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/attachkit/`. Returns
    /// defaults if neither holds a readable file.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("attachkit").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("attachkit")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|path| path.exists()) {
            match Self::load_from_file(path) {
                Ok(settings) => return settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }
}
