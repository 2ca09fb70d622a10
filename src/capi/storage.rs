//! Storage extension and configuration entry points.

use super::{
    AttachkitAttachFn, AttachkitAttachInfo, AttachkitConfig, AttachkitDeleteFn, AttachkitState,
    AttachkitStorageExtension, AttachkitTransactionFn, AttachkitTransactionInfo, RawPointer,
    StorageExtensionWrapper, extra_info_ptr, utf8,
};
use crate::config::DbConfig;
use crate::extension::{
    AttachCallback, AttachHandle, ExtraInfoData, ExtraInfoDestructor, StorageExtension,
    TransactionCallback, TransactionHandle,
};
use std::ffi::{c_char, c_void};
use std::ptr;
use std::sync::Arc;

/// # Safety
///
/// `extension` must be null or a live handle from
/// [`attachkit_create_storage_extension`].
unsafe fn extension_mut<'x>(
    extension: *mut AttachkitStorageExtension,
) -> Option<&'x mut StorageExtension> {
    // SAFETY: per the caller's contract the handle is null or a live wrapper.
    let wrapper = unsafe { extension.cast::<StorageExtensionWrapper>().as_mut() }?;
    wrapper.extension.as_mut()
}

fn c_destructor(destroy: unsafe extern "C" fn(*mut c_void)) -> ExtraInfoDestructor {
    Box::new(move |data: &ExtraInfoData| {
        if let Some(pointer) = (**data).downcast_ref::<RawPointer>()
            && !pointer.0.is_null()
        {
            // SAFETY: the registering caller paired this destructor with this
            // pointer.
            unsafe { destroy(pointer.0) };
        }
    })
}

fn c_attach(attach: unsafe extern "C" fn(*mut AttachkitAttachInfo)) -> AttachCallback {
    Arc::new(move |handle: &mut AttachHandle<'_, '_>| {
        // SAFETY: the raw handle points at a live `AttachHandle` for the
        // duration of the call.
        unsafe { attach(ptr::from_mut(handle).cast()) }
    })
}

fn c_transaction(
    create: unsafe extern "C" fn(*mut AttachkitTransactionInfo),
) -> TransactionCallback {
    Arc::new(move |handle: &mut TransactionHandle<'_, '_>| {
        // SAFETY: the raw handle points at a live `TransactionHandle` for the
        // duration of the call.
        unsafe { create(ptr::from_mut(handle).cast()) }
    })
}

/// Creates an empty storage extension.
///
/// The caller owns the handle until it is registered or destroyed.
#[unsafe(no_mangle)]
pub extern "C" fn attachkit_create_storage_extension() -> *mut AttachkitStorageExtension {
    let wrapper = Box::new(StorageExtensionWrapper {
        extension: Some(StorageExtension::new()),
    });
    Box::into_raw(wrapper).cast()
}

/// Destroys an unregistered storage extension and nulls the handle.
///
/// # Safety
///
/// `extension` must be null or point at a handle that is null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_destroy_storage_extension(
    extension: *mut *mut AttachkitStorageExtension,
) {
    // SAFETY: per the caller's contract.
    let Some(slot) = (unsafe { extension.as_mut() }) else {
        return;
    };
    if slot.is_null() {
        return;
    }
    // SAFETY: a non-null handle came from `Box::into_raw` in
    // `attachkit_create_storage_extension`.
    drop(unsafe { Box::from_raw(slot.cast::<StorageExtensionWrapper>()) });
    *slot = ptr::null_mut();
}

/// Sets the extension's extra-info.
///
/// The previous extra-info's destructor runs first, unless `extra_info` is the
/// pointer already stored. A null `destroy` leaves ownership with the caller.
///
/// # Safety
///
/// `extension` must be null or live. `destroy`, if set, must accept
/// `extra_info`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_storage_extension_set_extra_info(
    extension: *mut AttachkitStorageExtension,
    extra_info: *mut c_void,
    destroy: AttachkitDeleteFn,
) {
    // SAFETY: per the caller's contract.
    let Some(extension) = (unsafe { extension_mut(extension) }) else {
        return;
    };
    let data: ExtraInfoData = match extension.extra_info() {
        Some(current)
            if (**current)
                .downcast_ref::<RawPointer>()
                .is_some_and(|pointer| pointer.0 == extra_info) =>
        {
            Arc::clone(current)
        },
        _ => Arc::new(RawPointer(extra_info)),
    };
    extension.set_extra_info(data, destroy.map(c_destructor));
}

/// Returns the extension's extra-info, or null.
///
/// # Safety
///
/// `extension` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_storage_extension_get_extra_info(
    extension: *mut AttachkitStorageExtension,
) -> *mut c_void {
    // SAFETY: per the caller's contract.
    unsafe { extension_mut(extension) }
        .and_then(|extension| extension.extra_info())
        .map_or(ptr::null_mut(), extra_info_ptr)
}

/// Sets the attach callback. A null callback is ignored.
///
/// # Safety
///
/// `extension` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_storage_extension_set_attach(
    extension: *mut AttachkitStorageExtension,
    attach: AttachkitAttachFn,
) {
    // SAFETY: per the caller's contract.
    if let Some(extension) = unsafe { extension_mut(extension) } {
        extension.set_attach_callback(attach.map(c_attach));
    }
}

/// Sets the transaction-manager callback. A null callback is ignored.
///
/// # Safety
///
/// `extension` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_storage_extension_set_transaction(
    extension: *mut AttachkitStorageExtension,
    create_transaction: AttachkitTransactionFn,
) {
    // SAFETY: per the caller's contract.
    if let Some(extension) = unsafe { extension_mut(extension) } {
        extension.set_transaction_callback(create_transaction.map(c_transaction));
    }
}

/// Creates an empty configuration.
///
/// # Safety
///
/// `out_config` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_create_config(
    out_config: *mut *mut AttachkitConfig,
) -> AttachkitState {
    // SAFETY: per the caller's contract.
    let Some(slot) = (unsafe { out_config.as_mut() }) else {
        return AttachkitState::Error;
    };
    *slot = Box::into_raw(Box::new(DbConfig::new())).cast();
    AttachkitState::Success
}

/// Destroys a configuration and nulls the handle.
///
/// Databases already opened from it keep their registry.
///
/// # Safety
///
/// `config` must be null or point at a handle that is null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_destroy_config(config: *mut *mut AttachkitConfig) {
    // SAFETY: per the caller's contract.
    let Some(slot) = (unsafe { config.as_mut() }) else {
        return;
    };
    if slot.is_null() {
        return;
    }
    // SAFETY: a non-null handle came from `attachkit_create_config`.
    drop(unsafe { Box::from_raw(slot.cast::<DbConfig>()) });
    *slot = ptr::null_mut();
}

/// Registers `extension` under `type_name`.
///
/// On success the configuration takes ownership and the extension handle is
/// freed; the caller must not use or destroy it again. On failure the caller
/// still owns it.
///
/// # Safety
///
/// Each pointer must be null or live; `type_name` must be NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_config_add_storage_extension(
    config: *mut AttachkitConfig,
    type_name: *const c_char,
    extension: *mut AttachkitStorageExtension,
) -> AttachkitState {
    // SAFETY: per the caller's contract.
    let Some(config) = (unsafe { config.cast::<DbConfig>().as_ref() }) else {
        return AttachkitState::Error;
    };
    // SAFETY: per the caller's contract.
    let Some(type_name) = (unsafe { utf8(type_name) }).filter(|name| !name.is_empty()) else {
        return AttachkitState::Error;
    };
    let wrapper_ptr = extension.cast::<StorageExtensionWrapper>();
    // SAFETY: per the caller's contract.
    let Some(wrapper) = (unsafe { wrapper_ptr.as_mut() }) else {
        return AttachkitState::Error;
    };
    let Some(entry) = wrapper.extension.take() else {
        return AttachkitState::Error;
    };

    if let Err(e) = config.add_storage_extension(type_name, entry) {
        tracing::warn!(type_name, error = %e, "C storage extension registration failed");
        return AttachkitState::Error;
    }
    // SAFETY: the wrapper came from `Box::into_raw` and is no longer
    // referenced.
    drop(unsafe { Box::from_raw(wrapper_ptr) });
    AttachkitState::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_destroy(_: *mut c_void) {
        DESTROYED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_null_handles_are_ignored() {
        // SAFETY: null handles are accepted by every entry point.
        unsafe {
            attachkit_storage_extension_set_extra_info(ptr::null_mut(), ptr::null_mut(), None);
            assert!(attachkit_storage_extension_get_extra_info(ptr::null_mut()).is_null());
            attachkit_storage_extension_set_attach(ptr::null_mut(), None);
            attachkit_storage_extension_set_transaction(ptr::null_mut(), None);
            attachkit_destroy_storage_extension(ptr::null_mut());
            attachkit_destroy_config(ptr::null_mut());
            assert_eq!(attachkit_create_config(ptr::null_mut()), AttachkitState::Error);
            assert_eq!(
                attachkit_config_add_storage_extension(
                    ptr::null_mut(),
                    c"x".as_ptr(),
                    ptr::null_mut()
                ),
                AttachkitState::Error
            );
        }
    }

    #[test]
    fn test_extra_info_replacement_and_same_pointer() {
        let mut first = 1_u8;
        let mut second = 2_u8;
        let first_ptr = ptr::from_mut(&mut first).cast::<c_void>();
        let second_ptr = ptr::from_mut(&mut second).cast::<c_void>();
        let start = DESTROYED.load(Ordering::SeqCst);

        let mut extension = attachkit_create_storage_extension();
        // SAFETY: `extension` is live until destroyed below.
        unsafe {
            attachkit_storage_extension_set_extra_info(extension, first_ptr, Some(count_destroy));
            attachkit_storage_extension_set_extra_info(extension, first_ptr, Some(count_destroy));
            assert_eq!(DESTROYED.load(Ordering::SeqCst), start);

            attachkit_storage_extension_set_extra_info(extension, second_ptr, None);
            assert_eq!(DESTROYED.load(Ordering::SeqCst), start + 1);
            assert_eq!(attachkit_storage_extension_get_extra_info(extension), second_ptr);

            attachkit_destroy_storage_extension(&raw mut extension);
        }
        assert!(extension.is_null());
        assert_eq!(DESTROYED.load(Ordering::SeqCst), start + 1);
    }

    #[test]
    fn test_registration_consumes_handle() {
        let mut config = ptr::null_mut();
        let mut extension = attachkit_create_storage_extension();
        // SAFETY: handles are live; `extension` is not used after success.
        unsafe {
            assert_eq!(attachkit_create_config(&raw mut config), AttachkitState::Success);
            assert_eq!(
                attachkit_config_add_storage_extension(config, c"".as_ptr(), extension),
                AttachkitState::Error
            );
            assert_eq!(
                attachkit_config_add_storage_extension(config, c"cstorage".as_ptr(), extension),
                AttachkitState::Success
            );
            let registered = config.cast::<DbConfig>().as_ref().unwrap();
            assert!(registered.storage_extension("cstorage").unwrap().is_some());
            extension = ptr::null_mut();
            attachkit_destroy_storage_extension(&raw mut extension);
            attachkit_destroy_config(&raw mut config);
        }
        assert!(config.is_null());
    }
}
