//! Storage extension registry entries.

use super::handle::{AttachHandle, TransactionHandle};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Auxiliary data attached to an extension and visible to its callbacks.
pub type ExtraInfoData = Arc<dyn Any + Send + Sync>;

/// Destructor run exactly once when extra-info is replaced or the entry is
/// dropped.
pub type ExtraInfoDestructor = Box<dyn FnOnce(&ExtraInfoData) + Send + Sync>;

/// Attach callback: fills in the call context through the handle.
pub type AttachCallback = Arc<dyn Fn(&mut AttachHandle<'_, '_>) + Send + Sync>;

/// Transaction-manager callback: fills in the call context through the handle.
pub type TransactionCallback = Arc<dyn Fn(&mut TransactionHandle<'_, '_>) + Send + Sync>;

/// Owned extra-info slot.
struct ExtraInfo {
    data: ExtraInfoData,
    destructor: Option<ExtraInfoDestructor>,
}

impl Drop for ExtraInfo {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.take() {
            destructor(&self.data);
        }
    }
}

/// A pluggable storage provider, registered under a type name.
///
/// Holds the attach and transaction-manager callbacks plus optional
/// extra-info. Once registered, the entry is owned by the registry and is
/// shared read-only with dispatch.
///
/// # Example
///
/// ```rust
/// use attachkit::extension::StorageExtension;
///
/// let extension = StorageExtension::new()
///     .with_attach(|info| info.set_default_catalog())
///     .with_transaction(|info| info.set_default_transaction_manager());
/// assert!(extension.has_attach_callback());
/// ```
#[derive(Default)]
pub struct StorageExtension {
    pub(crate) type_name: Option<String>,
    pub(crate) attach_callback: Option<AttachCallback>,
    pub(crate) transaction_callback: Option<TransactionCallback>,
    extra_info: Option<ExtraInfo>,
}

impl StorageExtension {
    /// Creates an entry with no callbacks and no extra-info.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the type name, once registered.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Sets the attach callback. `None` leaves the current callback in place.
    pub fn set_attach_callback(&mut self, callback: Option<AttachCallback>) {
        if let Some(callback) = callback {
            self.attach_callback = Some(callback);
        }
    }

    /// Sets the transaction-manager callback. `None` leaves the current
    /// callback in place.
    pub fn set_transaction_callback(&mut self, callback: Option<TransactionCallback>) {
        if let Some(callback) = callback {
            self.transaction_callback = Some(callback);
        }
    }

    /// Builder form of [`set_attach_callback`](Self::set_attach_callback).
    #[must_use]
    pub fn with_attach<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut AttachHandle<'_, '_>) + Send + Sync + 'static,
    {
        self.set_attach_callback(Some(Arc::new(callback)));
        self
    }

    /// Builder form of [`set_transaction_callback`](Self::set_transaction_callback).
    #[must_use]
    pub fn with_transaction<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut TransactionHandle<'_, '_>) + Send + Sync + 'static,
    {
        self.set_transaction_callback(Some(Arc::new(callback)));
        self
    }

    /// Returns true if an attach callback is set.
    #[must_use]
    pub const fn has_attach_callback(&self) -> bool {
        self.attach_callback.is_some()
    }

    /// Returns true if a transaction-manager callback is set.
    #[must_use]
    pub const fn has_transaction_callback(&self) -> bool {
        self.transaction_callback.is_some()
    }

    /// Stores extra-info, destroying the previous one first.
    ///
    /// A `None` destructor means the caller keeps ownership and nothing runs
    /// on replacement. Re-setting the same data pointer swaps the destructor
    /// without running the old one.
    pub fn set_extra_info(&mut self, data: ExtraInfoData, destructor: Option<ExtraInfoDestructor>) {
        if let Some(mut previous) = self.extra_info.take() {
            if Arc::ptr_eq(&previous.data, &data) {
                previous.destructor = None;
            }
            drop(previous);
        }
        self.extra_info = Some(ExtraInfo { data, destructor });
    }

    /// Builder form of [`set_extra_info`](Self::set_extra_info) without a
    /// destructor.
    #[must_use]
    pub fn with_extra_info<T: Any + Send + Sync>(mut self, data: Arc<T>) -> Self {
        self.set_extra_info(data, None);
        self
    }

    /// Returns the extra-info, if set.
    #[must_use]
    pub fn extra_info(&self) -> Option<&ExtraInfoData> {
        self.extra_info.as_ref().map(|info| &info.data)
    }

    /// Returns the extra-info downcast to `T`.
    #[must_use]
    pub fn extra_info_as<T: Any>(&self) -> Option<&T> {
        self.extra_info().and_then(|data| (**data).downcast_ref::<T>())
    }
}

impl fmt::Debug for StorageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageExtension")
            .field("type_name", &self.type_name)
            .field("attach_callback", &self.attach_callback.is_some())
            .field("transaction_callback", &self.transaction_callback.is_some())
            .field("extra_info", &self.extra_info.is_some())
            .finish()
    }
}
