//! Type-name keyed storage extension registry.

use super::StorageExtension;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of storage extensions keyed by ATTACH `TYPE`.
///
/// Registration takes the write lock; lookups during dispatch share the read
/// lock, so extensions registered while statements run are safe.
#[derive(Debug, Default)]
pub struct StorageExtensionRegistry {
    extensions: RwLock<HashMap<String, Arc<StorageExtension>>>,
}

impl StorageExtensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `extension` under `type_name`.
    ///
    /// An existing entry with the same name is replaced and dropped (running
    /// its extra-info destructor once no dispatch still holds it).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `type_name` is empty, or
    /// [`Error::OperationFailed`] if the registry lock is poisoned.
    pub fn register(&self, type_name: &str, mut extension: StorageExtension) -> Result<()> {
        if type_name.is_empty() {
            return Err(Error::InvalidInput(
                "storage extension type name must not be empty".to_string(),
            ));
        }
        extension.type_name = Some(type_name.to_string());

        let previous = {
            let mut extensions = self.extensions.write().map_err(|e| Error::OperationFailed {
                operation: "register_storage_extension".to_string(),
                cause: e.to_string(),
            })?;
            extensions.insert(type_name.to_string(), Arc::new(extension))
        };

        metrics::counter!("storage_extension_registered_total").increment(1);
        if previous.is_some() {
            tracing::debug!(type_name, "Replaced storage extension");
        } else {
            tracing::debug!(type_name, "Registered storage extension");
        }
        // The replaced entry is released after the write lock.
        drop(previous);
        Ok(())
    }

    /// Looks up the extension registered under `type_name`.
    pub fn get(&self, type_name: &str) -> Result<Option<Arc<StorageExtension>>> {
        let extensions = self.extensions.read().map_err(|e| Error::OperationFailed {
            operation: "lookup_storage_extension".to_string(),
            cause: e.to_string(),
        })?;
        Ok(extensions.get(type_name).cloned())
    }

    /// Removes and returns the extension registered under `type_name`.
    pub fn remove(&self, type_name: &str) -> Result<Option<Arc<StorageExtension>>> {
        let mut extensions = self.extensions.write().map_err(|e| Error::OperationFailed {
            operation: "remove_storage_extension".to_string(),
            cause: e.to_string(),
        })?;
        Ok(extensions.remove(type_name))
    }

    /// Returns the registered type names, sorted.
    pub fn type_names(&self) -> Result<Vec<String>> {
        let extensions = self.extensions.read().map_err(|e| Error::OperationFailed {
            operation: "list_storage_extensions".to_string(),
            cause: e.to_string(),
        })?;
        let mut names: Vec<String> = extensions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
