//! Dispatch from the runtime into extension callbacks.

use super::context::{AttachCallContext, TransactionCallContext};
use super::handle::{AttachHandle, TransactionHandle};
use super::{CallbackKind, StorageExtension};
use crate::models::{AttachInfo, AttachOptions};
use crate::runtime::{AttachedDatabase, Catalog, ClientContext, TransactionManager};
use crate::{Error, Result};
use std::sync::Arc;

const UNREGISTERED: &str = "<unregistered>";

impl StorageExtension {
    /// Runs the attach callback and returns the catalog it produced.
    ///
    /// # Errors
    ///
    /// - [`Error::CallbackNotSet`] if no attach callback is registered.
    /// - [`Error::ExtensionReported`] with the callback's message if it called
    ///   `set_error`.
    /// - [`Error::MissingProduct`] if it returned without producing a catalog.
    pub fn attach(
        &self,
        client: &Arc<ClientContext>,
        database: &Arc<AttachedDatabase>,
        name: &str,
        attach_info: &mut AttachInfo,
        options: &AttachOptions,
    ) -> Result<Box<dyn Catalog>> {
        let span = tracing::debug_span!(
            "storage_attach",
            storage_type = self.type_name().unwrap_or(UNREGISTERED),
            attach_name = name,
        );
        let _enter = span.enter();

        let Some(callback) = self.attach_callback.as_ref() else {
            let err = Error::CallbackNotSet {
                callback: CallbackKind::Attach,
            };
            record_outcome(CallbackKind::Attach, Some(&err));
            tracing::warn!(error = %err, "Attach dispatched without a callback");
            return Err(err);
        };

        tracing::debug!(path = %attach_info.path, "Invoking attach callback");
        let mut context =
            AttachCallContext::new(self, client, database, name, attach_info, options);
        callback(&mut AttachHandle::new(&mut context));
        tracing::debug!(
            success = context.success(),
            produced = context.has_catalog(),
            cached_strings = context.string_cache.len(),
            "Attach callback returned"
        );

        let result = context.finish();
        record_outcome(CallbackKind::Attach, result.as_ref().err());
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Attach callback failed");
        }
        result
    }

    /// Runs the transaction-manager callback and returns the manager it
    /// produced.
    ///
    /// # Errors
    ///
    /// Same classes as [`attach`](Self::attach), for the transaction-manager
    /// slot.
    pub fn create_transaction_manager(
        &self,
        database: &Arc<AttachedDatabase>,
        catalog: &dyn Catalog,
    ) -> Result<Box<dyn TransactionManager>> {
        let span = tracing::debug_span!(
            "storage_create_transaction_manager",
            storage_type = self.type_name().unwrap_or(UNREGISTERED),
            attach_name = database.name(),
        );
        let _enter = span.enter();

        let Some(callback) = self.transaction_callback.as_ref() else {
            let err = Error::CallbackNotSet {
                callback: CallbackKind::CreateTransactionManager,
            };
            record_outcome(CallbackKind::CreateTransactionManager, Some(&err));
            tracing::warn!(error = %err, "Transaction manager dispatched without a callback");
            return Err(err);
        };

        let mut context = TransactionCallContext::new(self, database, catalog);
        callback(&mut TransactionHandle::new(&mut context));
        tracing::debug!(
            success = context.success(),
            produced = context.has_transaction_manager(),
            "Transaction manager callback returned"
        );

        let result = context.finish();
        record_outcome(CallbackKind::CreateTransactionManager, result.as_ref().err());
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Transaction manager callback failed");
        }
        result
    }
}

fn record_outcome(callback: CallbackKind, error: Option<&Error>) {
    let status = match error {
        None => "success",
        Some(Error::CallbackNotSet { .. }) => "not_set",
        Some(Error::MissingProduct { .. }) => "missing_product",
        Some(_) => "error",
    };
    metrics::counter!(
        "storage_extension_dispatch_total",
        "callback" => callback.label(),
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;
    use crate::runtime::{DefaultCatalog, DefaultTransactionManager};
    use std::sync::Mutex;

    struct Harness {
        client: Arc<ClientContext>,
        database: Arc<AttachedDatabase>,
        info: AttachInfo,
        options: AttachOptions,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                client: Arc::new(ClientContext::new()),
                database: Arc::new(AttachedDatabase::new("capi_ext", "cstorage")),
                info: AttachInfo::new("capi_ext", ":memory:"),
                options: AttachOptions::for_type("cstorage"),
            }
        }

        fn attach(&mut self, extension: &StorageExtension) -> Result<Box<dyn Catalog>> {
            extension.attach(
                &self.client,
                &self.database,
                "capi_ext",
                &mut self.info,
                &self.options,
            )
        }
    }

    #[test]
    fn test_attach_without_callback() {
        let mut harness = Harness::new();
        let err = harness.attach(&StorageExtension::new()).unwrap_err();
        assert!(err.is_defect());
        assert_eq!(
            err.to_string(),
            "Attach callback was not set for storage extension"
        );
    }

    #[test]
    fn test_attach_produces_default_catalog() {
        let mut harness = Harness::new();
        let extension = StorageExtension::new().with_attach(|info| info.set_default_catalog());
        let catalog = harness.attach(&extension).unwrap();
        assert_eq!(catalog.catalog_type(), DefaultCatalog::TYPE_NAME);
        assert_eq!(catalog.database().id(), harness.database.id());
    }

    #[test]
    fn test_attach_reported_error_is_verbatim() {
        let mut harness = Harness::new();
        let extension = StorageExtension::new().with_attach(|info| info.set_error("attach failure"));
        let err = harness.attach(&extension).unwrap_err();
        assert!(!err.is_defect());
        assert_eq!(err.to_string(), "attach failure");
    }

    #[test]
    fn test_attach_success_without_catalog_is_defect() {
        let mut harness = Harness::new();
        let extension = StorageExtension::new().with_attach(|_| {});
        let err = harness.attach(&extension).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingProduct {
                callback: CallbackKind::Attach
            }
        ));
    }

    #[test]
    fn test_set_path_is_visible_after_dispatch() {
        let mut harness = Harness::new();
        let extension = StorageExtension::new().with_attach(|info| {
            let rewritten = format!("{}.db", info.path().unwrap_or_default());
            info.set_path(rewritten);
            info.set_default_catalog();
        });
        harness.attach(&extension).unwrap();
        assert_eq!(harness.info.path, ":memory:.db");
    }

    #[test]
    fn test_option_lookups_inside_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut harness = Harness::new();
        harness.options.options.insert("k".to_string(), Value::from("call"));
        harness.info.options.insert("k".to_string(), Value::from("decl"));
        harness.info.options.insert("n".to_string(), Value::from(7));

        let sink = Arc::clone(&seen);
        let extension = StorageExtension::new().with_attach(move |info| {
            let k = info.get_option_varchar("k").map(str::to_string);
            let n = info.get_option_varchar("n").map(str::to_string);
            sink.lock().unwrap().push((k, n, info.get_option_bigint("missing")));
            info.set_default_catalog();
        });
        harness.attach(&extension).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Some("call".to_string()), Some("7".to_string()), None)]
        );
    }

    #[test]
    fn test_transaction_dispatch() {
        let database = Arc::new(AttachedDatabase::new("db", "test"));
        let catalog = DefaultCatalog::new(Arc::clone(&database));

        let missing = StorageExtension::new();
        let err = missing
            .create_transaction_manager(&database, &catalog)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Create transaction manager callback was not set for storage extension"
        );

        let empty = StorageExtension::new().with_transaction(|_| {});
        let err = empty
            .create_transaction_manager(&database, &catalog)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Create transaction manager callback did not produce a transaction manager"
        );

        let working = StorageExtension::new().with_transaction(|info| {
            assert_eq!(info.catalog().map(|c| c.catalog_type()), Some("default"));
            info.set_default_transaction_manager();
        });
        let manager = working
            .create_transaction_manager(&database, &catalog)
            .unwrap();
        assert!(manager.as_any().is::<DefaultTransactionManager>());
        assert_eq!(manager.database().id(), database.id());
    }

    #[test]
    fn test_transaction_error_dominates_manager() {
        let database = Arc::new(AttachedDatabase::new("db", "test"));
        let catalog = DefaultCatalog::new(Arc::clone(&database));
        let extension = StorageExtension::new().with_transaction(|info| {
            info.set_default_transaction_manager();
            info.set_error("no transactions today");
        });
        let err = extension
            .create_transaction_manager(&database, &catalog)
            .unwrap_err();
        assert_eq!(err.to_string(), "no transactions today");
    }
}
