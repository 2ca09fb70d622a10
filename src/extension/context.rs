//! Per-dispatch call contexts.
//!
//! A context lives on the dispatch function's stack for exactly one callback
//! invocation. Inputs are borrowed from the runtime; outputs (product,
//! success flag, error text) accumulate here and are read back once the
//! callback returns.

use super::{CallbackKind, OptionStore, StorageExtension};
use crate::models::{AttachInfo, AttachOptions};
use crate::runtime::{AttachedDatabase, Catalog, ClientContext, TransactionManager};
use crate::{Error, Result};
use std::ffi::{CStr, CString};
use std::sync::Arc;

/// Scratch strings owned by a call context.
///
/// Every interned string stays valid until the cache is dropped; later
/// entries never move earlier ones.
#[derive(Debug, Default)]
pub struct StringCache {
    entries: Vec<CString>,
}

impl StringCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Stores `value` and returns the cached copy.
    ///
    /// Returns `None` if `value` contains an interior NUL byte.
    pub fn intern(&mut self, value: String) -> Option<&CStr> {
        let entry = CString::new(value).ok()?;
        self.entries.push(entry);
        self.entries.last().map(CString::as_c_str)
    }

    /// Returns the number of cached strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State for one attach callback invocation.
pub(crate) struct AttachCallContext<'a> {
    pub(crate) extension: &'a StorageExtension,
    pub(crate) client: &'a Arc<ClientContext>,
    pub(crate) database: &'a Arc<AttachedDatabase>,
    pub(crate) name: &'a str,
    pub(crate) attach_info: &'a mut AttachInfo,
    pub(crate) options: &'a AttachOptions,
    catalog: Option<Box<dyn Catalog>>,
    success: bool,
    error: String,
    pub(crate) string_cache: StringCache,
}

impl<'a> AttachCallContext<'a> {
    /// Builds a fresh context: success set, no error, no catalog.
    pub(crate) fn new(
        extension: &'a StorageExtension,
        client: &'a Arc<ClientContext>,
        database: &'a Arc<AttachedDatabase>,
        name: &'a str,
        attach_info: &'a mut AttachInfo,
        options: &'a AttachOptions,
    ) -> Self {
        Self {
            extension,
            client,
            database,
            name,
            attach_info,
            options,
            catalog: None,
            success: true,
            error: String::new(),
            string_cache: StringCache::new(),
        }
    }

    /// Option view with call-site priority.
    pub(crate) fn option_store(&self) -> OptionStore<'_> {
        OptionStore::for_attach(self.options, &*self.attach_info)
    }

    /// Marks the call failed. Success never comes back once cleared.
    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.success = false;
        self.error = message.into();
    }

    /// Stores the catalog product unless one is already set.
    pub(crate) fn set_catalog(&mut self, catalog: Box<dyn Catalog>) {
        if self.catalog.is_none() {
            self.catalog = Some(catalog);
        }
    }

    pub(crate) const fn success(&self) -> bool {
        self.success
    }

    pub(crate) const fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    /// Translates accumulated state into the dispatch result.
    pub(crate) fn finish(self) -> Result<Box<dyn Catalog>> {
        if !self.success {
            return Err(Error::ExtensionReported(self.error));
        }
        self.catalog.ok_or(Error::MissingProduct {
            callback: CallbackKind::Attach,
        })
    }
}

/// State for one transaction-manager callback invocation.
pub(crate) struct TransactionCallContext<'a> {
    pub(crate) extension: &'a StorageExtension,
    pub(crate) database: &'a Arc<AttachedDatabase>,
    pub(crate) catalog: &'a dyn Catalog,
    manager: Option<Box<dyn TransactionManager>>,
    success: bool,
    error: String,
}

impl<'a> TransactionCallContext<'a> {
    /// Builds a fresh context: success set, no error, no manager.
    pub(crate) fn new(
        extension: &'a StorageExtension,
        database: &'a Arc<AttachedDatabase>,
        catalog: &'a dyn Catalog,
    ) -> Self {
        Self {
            extension,
            database,
            catalog,
            manager: None,
            success: true,
            error: String::new(),
        }
    }

    /// Marks the call failed. Success never comes back once cleared.
    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.success = false;
        self.error = message.into();
    }

    /// Stores the manager product unless one is already set.
    pub(crate) fn set_transaction_manager(&mut self, manager: Box<dyn TransactionManager>) {
        if self.manager.is_none() {
            self.manager = Some(manager);
        }
    }

    pub(crate) const fn success(&self) -> bool {
        self.success
    }

    pub(crate) const fn has_transaction_manager(&self) -> bool {
        self.manager.is_some()
    }

    /// Translates accumulated state into the dispatch result.
    pub(crate) fn finish(self) -> Result<Box<dyn TransactionManager>> {
        if !self.success {
            return Err(Error::ExtensionReported(self.error));
        }
        self.manager.ok_or(Error::MissingProduct {
            callback: CallbackKind::CreateTransactionManager,
        })
    }
}
