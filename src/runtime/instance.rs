//! Attach/detach driver.

use super::{AttachedDatabase, Catalog, ClientContext, TransactionManager};
use crate::config::DbConfig;
use crate::extension::StorageExtension;
use crate::models::{AttachInfo, AttachOptions};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// A database attached through a storage extension.
#[derive(Debug)]
pub struct Attachment {
    database: Arc<AttachedDatabase>,
    path: String,
    catalog: Box<dyn Catalog>,
    transaction_manager: Box<dyn TransactionManager>,
}

impl Attachment {
    /// Returns the attached database.
    #[must_use]
    pub const fn database(&self) -> &Arc<AttachedDatabase> {
        &self.database
    }

    /// Returns the path after any rewrite by the extension.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the catalog produced by the attach callback.
    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// Returns the transaction manager produced for this database.
    #[must_use]
    pub fn transaction_manager(&self) -> &dyn TransactionManager {
        self.transaction_manager.as_ref()
    }
}

/// An open runtime instance.
///
/// # Example
///
/// ```rust
/// use attachkit::{AttachInfo, AttachOptions, Database, DbConfig, Error};
///
/// let db = Database::open(DbConfig::new());
/// let client = db.connect();
/// let err = db
///     .attach(&client, AttachInfo::new("x", ""), AttachOptions::for_type("nope"))
///     .unwrap_err();
/// assert!(matches!(err, Error::UnknownStorageType(_)));
/// ```
#[derive(Debug)]
pub struct Database {
    config: DbConfig,
    attachments: RwLock<BTreeMap<String, Arc<Attachment>>>,
}

impl Database {
    /// Opens a runtime over `config`.
    #[must_use]
    pub fn open(config: DbConfig) -> Self {
        tracing::debug!("Opened database");
        Self {
            config,
            attachments: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the configuration this runtime was opened with.
    #[must_use]
    pub const fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Opens a new client connection.
    #[must_use]
    pub fn connect(&self) -> Arc<ClientContext> {
        let client = Arc::new(ClientContext::new());
        tracing::debug!(connection_id = client.connection_id(), "Client connected");
        client
    }

    /// Registers a storage extension while the runtime is live.
    ///
    /// # Errors
    ///
    /// Same as [`DbConfig::add_storage_extension`].
    pub fn register_storage_extension(
        &self,
        type_name: &str,
        extension: StorageExtension,
    ) -> Result<()> {
        self.config.add_storage_extension(type_name, extension)
    }

    /// Attaches a database through the extension named by `options.db_type`.
    ///
    /// Runs the attach callback, then the transaction-manager callback. The
    /// attachment is installed only if both succeed.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the name is empty or no type was given.
    /// - [`Error::AlreadyAttached`] if the name is taken.
    /// - [`Error::UnknownStorageType`] if no extension has that type.
    /// - Any dispatch error from either callback.
    pub fn attach(
        &self,
        client: &Arc<ClientContext>,
        mut info: AttachInfo,
        options: AttachOptions,
    ) -> Result<Arc<Attachment>> {
        if info.name.is_empty() {
            return Err(Error::InvalidInput(
                "attach name must not be empty".to_string(),
            ));
        }
        let Some(storage_type) = options.db_type.as_deref() else {
            return Err(Error::InvalidInput(format!(
                "no storage type given for '{}'",
                info.name
            )));
        };
        if self.read_attachments()?.contains_key(&info.name) {
            return Err(Error::AlreadyAttached(info.name));
        }
        let extension = self
            .config
            .storage_extension(storage_type)?
            .ok_or_else(|| Error::UnknownStorageType(storage_type.to_string()))?;

        let name = info.name.clone();
        let database = Arc::new(AttachedDatabase::new(name.as_str(), storage_type));
        let catalog = extension.attach(client, &database, &name, &mut info, &options)?;
        let transaction_manager = extension.create_transaction_manager(&database, catalog.as_ref())?;

        let attachment = Arc::new(Attachment {
            database,
            path: info.path,
            catalog,
            transaction_manager,
        });

        let mut attachments = self.write_attachments()?;
        if attachments.contains_key(&name) {
            return Err(Error::AlreadyAttached(name));
        }
        attachments.insert(name.clone(), Arc::clone(&attachment));
        metrics::gauge!("attached_databases").set(count_as_f64(attachments.len()));
        drop(attachments);

        tracing::info!(
            attach_name = %name,
            storage_type,
            path = %attachment.path,
            database_id = %attachment.database.id(),
            "Attached database"
        );
        Ok(attachment)
    }

    /// Attaches every `[[attach]]` declaration from the settings, in order.
    ///
    /// Stops at the first failure; earlier attachments stay installed.
    ///
    /// # Errors
    ///
    /// Returns the first attach error.
    pub fn attach_declared(&self, client: &Arc<ClientContext>) -> Result<Vec<Arc<Attachment>>> {
        self.config
            .settings
            .attachments
            .iter()
            .map(|declaration| {
                let (info, options) = declaration.to_attach_inputs();
                self.attach(client, info, options)
            })
            .collect()
    }

    /// Detaches the database attached as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAttached`] if nothing is attached under `name`.
    pub fn detach(&self, name: &str) -> Result<Arc<Attachment>> {
        let mut attachments = self.write_attachments()?;
        let removed = attachments
            .remove(name)
            .ok_or_else(|| Error::NotAttached(name.to_string()))?;
        metrics::gauge!("attached_databases").set(count_as_f64(attachments.len()));
        drop(attachments);

        tracing::info!(attach_name = name, "Detached database");
        Ok(removed)
    }

    /// Returns the attachment named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment lock is poisoned.
    pub fn attachment(&self, name: &str) -> Result<Option<Arc<Attachment>>> {
        Ok(self.read_attachments()?.get(name).cloned())
    }

    /// Returns the attached names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment lock is poisoned.
    pub fn attached_names(&self) -> Result<Vec<String>> {
        Ok(self.read_attachments()?.keys().cloned().collect())
    }

    fn read_attachments(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<Attachment>>>> {
        self.attachments.read().map_err(|e| Error::OperationFailed {
            operation: "read_attachments".to_string(),
            cause: e.to_string(),
        })
    }

    fn write_attachments(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Arc<Attachment>>>> {
        self.attachments.write().map_err(|e| Error::OperationFailed {
            operation: "write_attachments".to_string(),
            cause: e.to_string(),
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn count_as_f64(count: usize) -> f64 {
    count as f64
}
