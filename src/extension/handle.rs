//! Handles passed to extension callbacks.
//!
//! Each handle is a tagged capability over exactly one kind of call context:
//! an [`AttachHandle`] can never reach a transaction context and vice versa.
//! A null handle (see [`AttachHandle::null`]) turns every accessor into a
//! no-op returning `None`, which is what the C boundary hands out for a null
//! pointer.

use super::ExtraInfoData;
use super::context::{AttachCallContext, TransactionCallContext};
use crate::runtime::{
    AttachedDatabase, Catalog, ClientContextHandle, DefaultCatalog, DefaultTransactionManager,
    TransactionManager,
};
use std::any::Any;
use std::ffi::CStr;
use std::sync::Arc;

/// Capability handed to an attach callback.
pub struct AttachHandle<'h, 'a> {
    context: Option<&'h mut AttachCallContext<'a>>,
}

impl<'h, 'a> AttachHandle<'h, 'a> {
    pub(crate) const fn new(context: &'h mut AttachCallContext<'a>) -> Self {
        Self {
            context: Some(context),
        }
    }

    /// A handle bound to no context.
    #[must_use]
    pub const fn null() -> Self {
        Self { context: None }
    }

    /// Returns true for a handle bound to no context.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.context.is_none()
    }

    /// Returns the attach name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.context.as_deref().map(|context| context.name)
    }

    /// Returns the current database path.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.context
            .as_deref()
            .map(|context| context.attach_info.path.as_str())
    }

    /// Replaces the database path.
    pub fn set_path(&mut self, path: impl Into<String>) {
        if let Some(context) = self.context.as_deref_mut() {
            context.attach_info.path = path.into();
        }
    }

    /// Returns the database being attached.
    #[must_use]
    pub fn database(&self) -> Option<&Arc<AttachedDatabase>> {
        self.context.as_deref().map(|context| context.database)
    }

    /// Builds a new wrapper around the calling client's context.
    #[must_use]
    pub fn client_context(&self) -> Option<ClientContextHandle> {
        self.context
            .as_deref()
            .map(|context| ClientContextHandle::new(context.client))
    }

    /// Returns the extension's extra-info.
    #[must_use]
    pub fn extra_info(&self) -> Option<&ExtraInfoData> {
        self.context.as_deref()?.extension.extra_info()
    }

    /// Returns the extension's extra-info downcast to `T`.
    #[must_use]
    pub fn extra_info_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.extension.extra_info_as::<T>()
    }

    /// Returns an option as text.
    ///
    /// The converted string is kept in the context's scratch cache for the
    /// rest of the dispatch.
    pub fn get_option_varchar(&mut self, key: &str) -> Option<&str> {
        self.option_varchar_cstr(key)?.to_str().ok()
    }

    /// Returns an option as a boolean.
    #[must_use]
    pub fn get_option_boolean(&self, key: &str) -> Option<bool> {
        self.context.as_deref()?.option_store().get_bool(key)
    }

    /// Returns an option as a 64-bit integer.
    #[must_use]
    pub fn get_option_bigint(&self, key: &str) -> Option<i64> {
        self.context.as_deref()?.option_store().get_int64(key)
    }

    /// Returns an option as a real.
    #[must_use]
    pub fn get_option_double(&self, key: &str) -> Option<f64> {
        self.context.as_deref()?.option_store().get_double(key)
    }

    /// Marks the attach as failed with `message`.
    pub fn set_error(&mut self, message: &str) {
        if let Some(context) = self.context.as_deref_mut() {
            context.set_error(message);
        }
    }

    /// Produces the runtime's built-in catalog bound to the database.
    pub fn set_default_catalog(&mut self) {
        if let Some(context) = self.context.as_deref_mut() {
            let catalog = DefaultCatalog::new(Arc::clone(context.database));
            context.set_catalog(Box::new(catalog));
        }
    }

    /// Produces an extension-supplied catalog.
    pub fn set_catalog(&mut self, catalog: Box<dyn Catalog>) {
        if let Some(context) = self.context.as_deref_mut() {
            context.set_catalog(catalog);
        }
    }

    pub(crate) fn name_cstr(&mut self) -> Option<&CStr> {
        let context = self.context.as_deref_mut()?;
        context.string_cache.intern(context.name.to_string())
    }

    pub(crate) fn path_cstr(&mut self) -> Option<&CStr> {
        let context = self.context.as_deref_mut()?;
        let path = context.attach_info.path.clone();
        context.string_cache.intern(path)
    }

    pub(crate) fn option_varchar_cstr(&mut self, key: &str) -> Option<&CStr> {
        let context = self.context.as_deref_mut()?;
        let value = context.option_store().get_string(key)?;
        context.string_cache.intern(value)
    }
}

/// Capability handed to a transaction-manager callback.
pub struct TransactionHandle<'h, 'a> {
    context: Option<&'h mut TransactionCallContext<'a>>,
}

impl<'h, 'a> TransactionHandle<'h, 'a> {
    pub(crate) const fn new(context: &'h mut TransactionCallContext<'a>) -> Self {
        Self {
            context: Some(context),
        }
    }

    /// A handle bound to no context.
    #[must_use]
    pub const fn null() -> Self {
        Self { context: None }
    }

    /// Returns true for a handle bound to no context.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.context.is_none()
    }

    /// Returns the database the manager will coordinate.
    #[must_use]
    pub fn database(&self) -> Option<&Arc<AttachedDatabase>> {
        self.context.as_deref().map(|context| context.database)
    }

    /// Returns the catalog produced by the attach callback.
    #[must_use]
    pub fn catalog(&self) -> Option<&dyn Catalog> {
        self.context.as_deref().map(|context| context.catalog)
    }

    /// Returns the extension's extra-info.
    #[must_use]
    pub fn extra_info(&self) -> Option<&ExtraInfoData> {
        self.context.as_deref()?.extension.extra_info()
    }

    /// Returns the extension's extra-info downcast to `T`.
    #[must_use]
    pub fn extra_info_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.extension.extra_info_as::<T>()
    }

    /// Marks transaction-manager creation as failed with `message`.
    pub fn set_error(&mut self, message: &str) {
        if let Some(context) = self.context.as_deref_mut() {
            context.set_error(message);
        }
    }

    /// Produces the runtime's built-in transaction manager.
    pub fn set_default_transaction_manager(&mut self) {
        if let Some(context) = self.context.as_deref_mut() {
            let manager = DefaultTransactionManager::new(Arc::clone(context.database));
            context.set_transaction_manager(Box::new(manager));
        }
    }

    /// Produces an extension-supplied transaction manager.
    pub fn set_transaction_manager(&mut self, manager: Box<dyn TransactionManager>) {
        if let Some(context) = self.context.as_deref_mut() {
            context.set_transaction_manager(manager);
        }
    }
}
