//! Configuration management.

mod settings;

pub use settings::{AttachDeclaration, LoggingSettings, MetricsSettings, RuntimeSettings};

use crate::Result;
use crate::extension::{StorageExtension, StorageExtensionRegistry};
use std::sync::Arc;

/// Runtime configuration handed to [`Database::open`](crate::runtime::Database::open).
///
/// Owns the storage extension registry. Clones share the same registry, so
/// an extension registered through any clone is visible to every database
/// opened from it.
#[derive(Debug, Clone, Default)]
pub struct DbConfig {
    registry: Arc<StorageExtensionRegistry>,
    /// Settings loaded from TOML.
    pub settings: RuntimeSettings,
}

impl DbConfig {
    /// Creates a configuration with an empty registry and default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with the given settings.
    #[must_use]
    pub fn with_settings(settings: RuntimeSettings) -> Self {
        Self {
            registry: Arc::default(),
            settings,
        }
    }

    /// Registers `extension` under `type_name`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if `type_name` is empty or the registry lock is
    /// poisoned.
    pub fn add_storage_extension(&self, type_name: &str, extension: StorageExtension) -> Result<()> {
        self.registry.register(type_name, extension)
    }

    /// Looks up the extension registered under `type_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn storage_extension(&self, type_name: &str) -> Result<Option<Arc<StorageExtension>>> {
        self.registry.get(type_name)
    }

    /// Returns the registered type names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn storage_extension_types(&self) -> Result<Vec<String>> {
        self.registry.type_names()
    }

    /// Returns the shared registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<StorageExtensionRegistry> {
        &self.registry
    }
}
