//! Accessors callable from inside attach and transaction callbacks.

use super::{
    AttachkitAttachInfo, AttachkitClientContext, AttachkitTransactionInfo, extra_info_ptr, lossy,
    utf8,
};
use crate::extension::{AttachHandle, TransactionHandle};
use crate::runtime::ClientContextHandle;
use std::ffi::{CStr, c_char, c_void};
use std::ptr;

/// # Safety
///
/// `info` must be null or the pointer passed to the running attach callback.
unsafe fn attach_handle<'x>(info: *mut AttachkitAttachInfo) -> Option<&'x mut AttachHandle<'x, 'x>> {
    // SAFETY: only attach callbacks receive this handle type.
    unsafe { info.cast::<AttachHandle<'x, 'x>>().as_mut() }
}

/// # Safety
///
/// `info` must be null or the pointer passed to the running transaction
/// callback.
unsafe fn transaction_handle<'x>(
    info: *mut AttachkitTransactionInfo,
) -> Option<&'x mut TransactionHandle<'x, 'x>> {
    // SAFETY: only transaction callbacks receive this handle type.
    unsafe { info.cast::<TransactionHandle<'x, 'x>>().as_mut() }
}

/// Writes `value` through `out` when both are present.
///
/// # Safety
///
/// `out` must be null or writable.
unsafe fn write_out<T>(out: *mut T, value: Option<T>) -> bool {
    let Some(value) = value else {
        return false;
    };
    // SAFETY: per the caller's contract.
    match unsafe { out.as_mut() } {
        Some(slot) => {
            *slot = value;
            true
        },
        None => false,
    }
}

/// Returns the attach name, or null.
///
/// # Safety
///
/// `info` must be null or the running callback's handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_get_name(
    info: *mut AttachkitAttachInfo,
) -> *const c_char {
    // SAFETY: per the caller's contract.
    unsafe { attach_handle(info) }
        .and_then(AttachHandle::name_cstr)
        .map_or(ptr::null(), CStr::as_ptr)
}

/// Returns the current path, or null.
///
/// # Safety
///
/// `info` must be null or the running callback's handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_get_path(
    info: *mut AttachkitAttachInfo,
) -> *const c_char {
    // SAFETY: per the caller's contract.
    unsafe { attach_handle(info) }
        .and_then(AttachHandle::path_cstr)
        .map_or(ptr::null(), CStr::as_ptr)
}

/// Replaces the path. A null path is ignored.
///
/// # Safety
///
/// `info` must be null or the running callback's handle; `path` must be null
/// or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_set_path(
    info: *mut AttachkitAttachInfo,
    path: *const c_char,
) {
    // SAFETY: per the caller's contract.
    let (Some(handle), Some(path)) = (unsafe { attach_handle(info) }, unsafe { lossy(path) })
    else {
        return;
    };
    handle.set_path(path);
}

/// Produces the built-in catalog.
///
/// # Safety
///
/// `info` must be null or the running callback's handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_set_default_catalog(info: *mut AttachkitAttachInfo) {
    // SAFETY: per the caller's contract.
    if let Some(handle) = unsafe { attach_handle(info) } {
        handle.set_default_catalog();
    }
}

/// Marks the attach as failed. A null message is stored as empty.
///
/// # Safety
///
/// `info` must be null or the running callback's handle; `error` must be null
/// or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_set_error(
    info: *mut AttachkitAttachInfo,
    error: *const c_char,
) {
    // SAFETY: per the caller's contract.
    if let Some(handle) = unsafe { attach_handle(info) } {
        // SAFETY: per the caller's contract.
        let message = unsafe { lossy(error) }.unwrap_or_default();
        handle.set_error(&message);
    }
}

/// Returns the extension's extra-info, or null.
///
/// # Safety
///
/// `info` must be null or the running callback's handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_get_extra_info(
    info: *mut AttachkitAttachInfo,
) -> *mut c_void {
    // SAFETY: per the caller's contract.
    unsafe { attach_handle(info) }
        .and_then(|handle| handle.extra_info())
        .map_or(ptr::null_mut(), extra_info_ptr)
}

/// Writes a new client context wrapper to `out_context`.
///
/// The caller releases it with [`attachkit_destroy_client_context`].
///
/// # Safety
///
/// `info` must be null or the running callback's handle; `out_context` must
/// be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_get_client_context(
    info: *mut AttachkitAttachInfo,
    out_context: *mut *mut AttachkitClientContext,
) {
    // SAFETY: per the caller's contract.
    let (Some(handle), Some(slot)) = (unsafe { attach_handle(info) }, unsafe {
        out_context.as_mut()
    }) else {
        return;
    };
    *slot = handle
        .client_context()
        .map_or(ptr::null_mut(), |context| Box::into_raw(Box::new(context)).cast());
}

/// Releases a client context wrapper and nulls the handle.
///
/// # Safety
///
/// `context` must be null or point at a handle that is null or came from
/// [`attachkit_attach_info_get_client_context`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_destroy_client_context(context: *mut *mut AttachkitClientContext) {
    // SAFETY: per the caller's contract.
    let Some(slot) = (unsafe { context.as_mut() }) else {
        return;
    };
    if slot.is_null() {
        return;
    }
    // SAFETY: a non-null handle came from `Box::into_raw`.
    drop(unsafe { Box::from_raw(slot.cast::<ClientContextHandle>()) });
    *slot = ptr::null_mut();
}

/// Returns the wrapped connection id, or 0 for a null handle.
///
/// # Safety
///
/// `context` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_client_context_get_connection_id(
    context: *mut AttachkitClientContext,
) -> u64 {
    // SAFETY: per the caller's contract.
    unsafe { context.cast::<ClientContextHandle>().as_ref() }
        .map_or(0, ClientContextHandle::connection_id)
}

/// Looks up an option as text.
///
/// The string stays valid until the callback returns. Returns false if the
/// key is absent or not convertible.
///
/// # Safety
///
/// `info` must be null or the running callback's handle; `key` must be null
/// or NUL-terminated; `out_value` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_get_option_varchar(
    info: *mut AttachkitAttachInfo,
    key: *const c_char,
    out_value: *mut *const c_char,
) -> bool {
    // SAFETY: per the caller's contract.
    let (Some(handle), Some(key)) = (unsafe { attach_handle(info) }, unsafe { utf8(key) }) else {
        return false;
    };
    if out_value.is_null() {
        return false;
    }
    let value = handle.option_varchar_cstr(key).map(CStr::as_ptr);
    // SAFETY: checked non-null above.
    unsafe { write_out(out_value, value) }
}

/// Looks up an option as a boolean.
///
/// # Safety
///
/// Same as [`attachkit_attach_info_get_option_varchar`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_get_option_boolean(
    info: *mut AttachkitAttachInfo,
    key: *const c_char,
    out_value: *mut bool,
) -> bool {
    // SAFETY: per the caller's contract.
    let (Some(handle), Some(key)) = (unsafe { attach_handle(info) }, unsafe { utf8(key) }) else {
        return false;
    };
    // SAFETY: per the caller's contract.
    unsafe { write_out(out_value, handle.get_option_boolean(key)) }
}

/// Looks up an option as a 64-bit integer.
///
/// # Safety
///
/// Same as [`attachkit_attach_info_get_option_varchar`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_get_option_bigint(
    info: *mut AttachkitAttachInfo,
    key: *const c_char,
    out_value: *mut i64,
) -> bool {
    // SAFETY: per the caller's contract.
    let (Some(handle), Some(key)) = (unsafe { attach_handle(info) }, unsafe { utf8(key) }) else {
        return false;
    };
    // SAFETY: per the caller's contract.
    unsafe { write_out(out_value, handle.get_option_bigint(key)) }
}

/// Looks up an option as a double.
///
/// # Safety
///
/// Same as [`attachkit_attach_info_get_option_varchar`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach_info_get_option_double(
    info: *mut AttachkitAttachInfo,
    key: *const c_char,
    out_value: *mut f64,
) -> bool {
    // SAFETY: per the caller's contract.
    let (Some(handle), Some(key)) = (unsafe { attach_handle(info) }, unsafe { utf8(key) }) else {
        return false;
    };
    // SAFETY: per the caller's contract.
    unsafe { write_out(out_value, handle.get_option_double(key)) }
}

/// Produces the built-in transaction manager.
///
/// # Safety
///
/// `info` must be null or the running callback's handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_transaction_info_set_default_transaction_manager(
    info: *mut AttachkitTransactionInfo,
) {
    // SAFETY: per the caller's contract.
    if let Some(handle) = unsafe { transaction_handle(info) } {
        handle.set_default_transaction_manager();
    }
}

/// Marks transaction-manager creation as failed. A null message is stored as
/// empty.
///
/// # Safety
///
/// `info` must be null or the running callback's handle; `error` must be null
/// or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_transaction_info_set_error(
    info: *mut AttachkitTransactionInfo,
    error: *const c_char,
) {
    // SAFETY: per the caller's contract.
    if let Some(handle) = unsafe { transaction_handle(info) } {
        // SAFETY: per the caller's contract.
        let message = unsafe { lossy(error) }.unwrap_or_default();
        handle.set_error(&message);
    }
}

/// Returns the extension's extra-info, or null.
///
/// # Safety
///
/// `info` must be null or the running callback's handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_transaction_info_get_extra_info(
    info: *mut AttachkitTransactionInfo,
) -> *mut c_void {
    // SAFETY: per the caller's contract.
    unsafe { transaction_handle(info) }
        .and_then(|handle| handle.extra_info())
        .map_or(ptr::null_mut(), extra_info_ptr)
}
