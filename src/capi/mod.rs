//! C ABI over the storage extension protocol.
//!
//! Every handle type is opaque on the C side and points at exactly one Rust
//! type:
//!
//! | C handle | Points at |
//! |----------|-----------|
//! | `AttachkitStorageExtension` | a wrapper owning a [`StorageExtension`] until registration |
//! | `AttachkitConfig` | [`DbConfig`](crate::DbConfig) |
//! | `AttachkitDatabase` | [`Database`](crate::Database) plus one client connection |
//! | `AttachkitAttachInfo` | the [`AttachHandle`](crate::AttachHandle) of one dispatch |
//! | `AttachkitTransactionInfo` | the [`TransactionHandle`](crate::TransactionHandle) of one dispatch |
//! | `AttachkitClientContext` | a [`ClientContextHandle`](crate::runtime::ClientContextHandle) |
//!
//! Null handles are accepted everywhere and turn the call into a no-op.
//! Strings returned from attach-info accessors stay valid until the
//! callback returns.

mod database;
mod info;
mod storage;

pub use database::{
    AttachkitOption, attachkit_attach, attachkit_close, attachkit_detach, attachkit_free_string,
    attachkit_open,
};
pub use info::{
    attachkit_attach_info_get_client_context, attachkit_attach_info_get_extra_info,
    attachkit_attach_info_get_name, attachkit_attach_info_get_option_bigint,
    attachkit_attach_info_get_option_boolean, attachkit_attach_info_get_option_double,
    attachkit_attach_info_get_option_varchar, attachkit_attach_info_get_path,
    attachkit_attach_info_set_default_catalog, attachkit_attach_info_set_error,
    attachkit_attach_info_set_path, attachkit_client_context_get_connection_id,
    attachkit_destroy_client_context, attachkit_transaction_info_get_extra_info,
    attachkit_transaction_info_set_default_transaction_manager,
    attachkit_transaction_info_set_error,
};
pub use storage::{
    attachkit_config_add_storage_extension, attachkit_create_config,
    attachkit_create_storage_extension, attachkit_destroy_config,
    attachkit_destroy_storage_extension, attachkit_storage_extension_get_extra_info,
    attachkit_storage_extension_set_attach, attachkit_storage_extension_set_extra_info,
    attachkit_storage_extension_set_transaction,
};

use crate::extension::{ExtraInfoData, StorageExtension};
use std::ffi::{CStr, c_char, c_void};
use std::marker::{PhantomData, PhantomPinned};
use std::sync::Arc;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(C)]
        pub struct $name {
            _opaque: [u8; 0],
            _marker: PhantomData<(*mut u8, PhantomPinned)>,
        }
    };
}

opaque_handle!(
    /// Storage extension under construction.
    AttachkitStorageExtension
);
opaque_handle!(
    /// Runtime configuration.
    AttachkitConfig
);
opaque_handle!(
    /// Open runtime with its connection.
    AttachkitDatabase
);
opaque_handle!(
    /// Attach call context, valid only inside an attach callback.
    AttachkitAttachInfo
);
opaque_handle!(
    /// Transaction call context, valid only inside a transaction callback.
    AttachkitTransactionInfo
);
opaque_handle!(
    /// Client context wrapper owned by the caller.
    AttachkitClientContext
);

/// Return code for fallible C calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachkitState {
    /// The call succeeded.
    Success = 0,
    /// The call failed.
    Error = 1,
}

/// Attach callback.
pub type AttachkitAttachFn = Option<unsafe extern "C" fn(info: *mut AttachkitAttachInfo)>;

/// Transaction-manager callback.
pub type AttachkitTransactionFn =
    Option<unsafe extern "C" fn(info: *mut AttachkitTransactionInfo)>;

/// Extra-info destructor.
pub type AttachkitDeleteFn = Option<unsafe extern "C" fn(data: *mut c_void)>;

/// Extra-info pointer supplied from C.
#[derive(Debug, Clone, Copy)]
struct RawPointer(*mut c_void);

// SAFETY: the pointer is only handed back to the C caller that supplied it;
// Rust never dereferences it.
unsafe impl Send for RawPointer {}
// SAFETY: as above.
unsafe impl Sync for RawPointer {}

/// Returns the C view of an extension's extra-info.
///
/// Extra-info set from Rust is exposed by address.
fn extra_info_ptr(data: &ExtraInfoData) -> *mut c_void {
    (**data).downcast_ref::<RawPointer>().map_or_else(
        || Arc::as_ptr(data).cast::<c_void>().cast_mut(),
        |pointer| pointer.0,
    )
}

/// Reads a NUL-terminated UTF-8 string.
///
/// # Safety
///
/// `value` must be null or point at a NUL-terminated string that outlives `'s`.
unsafe fn utf8<'s>(value: *const c_char) -> Option<&'s str> {
    if value.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(value) }.to_str().ok()
}

/// Reads a NUL-terminated string, replacing invalid UTF-8.
///
/// # Safety
///
/// Same as [`utf8`].
unsafe fn lossy(value: *const c_char) -> Option<String> {
    if value.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
}

/// Owner of a [`StorageExtension`] until it is registered.
struct StorageExtensionWrapper {
    extension: Option<StorageExtension>,
}
