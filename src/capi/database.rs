//! Runtime entry points: open, attach, detach, close.

use super::{AttachkitConfig, AttachkitDatabase, AttachkitState, lossy, utf8};
use crate::config::DbConfig;
use crate::models::{AttachInfo, AttachOptions, Value};
use crate::runtime::{ClientContext, Database};
use crate::{Error, Result};
use std::ffi::{CString, c_char};
use std::ptr;
use std::sync::Arc;

/// One call-site option for [`attachkit_attach`].
///
/// Values are passed as text and coerced on lookup.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AttachkitOption {
    /// Option name.
    pub key: *const c_char,
    /// Option value.
    pub value: *const c_char,
}

struct DatabaseWrapper {
    database: Database,
    client: Arc<ClientContext>,
}

/// # Safety
///
/// `database` must be null or a live handle from [`attachkit_open`].
unsafe fn database_ref<'x>(database: *mut AttachkitDatabase) -> Option<&'x DatabaseWrapper> {
    // SAFETY: per the caller's contract.
    unsafe { database.cast::<DatabaseWrapper>().as_ref() }
}

/// Stores `message` in `out_error` for the caller to free.
///
/// # Safety
///
/// `out_error` must be null or writable.
unsafe fn report(out_error: *mut *mut c_char, error: &Error) -> AttachkitState {
    // SAFETY: per the caller's contract.
    if let Some(slot) = unsafe { out_error.as_mut() } {
        *slot = CString::new(error.to_string()).map_or(ptr::null_mut(), CString::into_raw);
    }
    AttachkitState::Error
}

/// # Safety
///
/// `options` must be null or point at `count` readable entries whose strings
/// are null or NUL-terminated.
unsafe fn call_site_options(
    db_type: String,
    options: *const AttachkitOption,
    count: usize,
) -> Result<AttachOptions> {
    let mut resolved = AttachOptions::for_type(db_type);
    if count == 0 {
        return Ok(resolved);
    }
    if options.is_null() {
        return Err(Error::InvalidInput(
            "option array is null but option count is non-zero".to_string(),
        ));
    }
    // SAFETY: non-null with `count` entries per the caller's contract.
    let entries = unsafe { std::slice::from_raw_parts(options, count) };
    for entry in entries {
        // SAFETY: per the caller's contract.
        let (Some(key), Some(value)) = (unsafe { lossy(entry.key) }, unsafe { lossy(entry.value) })
        else {
            return Err(Error::InvalidInput("option key or value is null".to_string()));
        };
        resolved.options.insert(key, Value::Varchar(value));
    }
    Ok(resolved)
}

/// Opens a runtime over `config` with one client connection.
///
/// The database shares the configuration's registry; destroying the
/// configuration afterwards is allowed. A null `config` opens with an empty
/// registry.
///
/// # Safety
///
/// `config` must be null or live; `out_database` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_open(
    config: *mut AttachkitConfig,
    out_database: *mut *mut AttachkitDatabase,
) -> AttachkitState {
    // SAFETY: per the caller's contract.
    let Some(slot) = (unsafe { out_database.as_mut() }) else {
        return AttachkitState::Error;
    };
    // SAFETY: per the caller's contract.
    let config = unsafe { config.cast::<DbConfig>().as_ref() }
        .cloned()
        .unwrap_or_default();
    let database = Database::open(config);
    let client = database.connect();
    *slot = Box::into_raw(Box::new(DatabaseWrapper { database, client })).cast();
    AttachkitState::Success
}

/// Closes a runtime, detaching everything, and nulls the handle.
///
/// # Safety
///
/// `database` must be null or point at a handle that is null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_close(database: *mut *mut AttachkitDatabase) {
    // SAFETY: per the caller's contract.
    let Some(slot) = (unsafe { database.as_mut() }) else {
        return;
    };
    if slot.is_null() {
        return;
    }
    // SAFETY: a non-null handle came from `attachkit_open`.
    drop(unsafe { Box::from_raw(slot.cast::<DatabaseWrapper>()) });
    *slot = ptr::null_mut();
}

/// Attaches `path` as `name` through the extension registered as `db_type`.
///
/// On failure, if `out_error` is non-null it receives a message the caller
/// frees with [`attachkit_free_string`].
///
/// # Safety
///
/// `database` must be null or live; strings must be null or NUL-terminated;
/// `options` must hold `option_count` entries; `out_error` must be null or
/// writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_attach(
    database: *mut AttachkitDatabase,
    path: *const c_char,
    name: *const c_char,
    db_type: *const c_char,
    options: *const AttachkitOption,
    option_count: usize,
    out_error: *mut *mut c_char,
) -> AttachkitState {
    // SAFETY: per the caller's contract.
    let Some(wrapper) = (unsafe { database_ref(database) }) else {
        return AttachkitState::Error;
    };
    // SAFETY: per the caller's contract.
    let (Some(path), Some(name), Some(db_type)) =
        (unsafe { lossy(path) }, unsafe { lossy(name) }, unsafe { lossy(db_type) })
    else {
        let error = Error::InvalidInput("path, name and type are required".to_string());
        // SAFETY: per the caller's contract.
        return unsafe { report(out_error, &error) };
    };

    // SAFETY: per the caller's contract.
    let result = unsafe { call_site_options(db_type, options, option_count) }.and_then(|options| {
        wrapper
            .database
            .attach(&wrapper.client, AttachInfo::new(name, path), options)
    });
    match result {
        Ok(_) => AttachkitState::Success,
        // SAFETY: per the caller's contract.
        Err(e) => unsafe { report(out_error, &e) },
    }
}

/// Detaches the database attached as `name`.
///
/// # Safety
///
/// `database` must be null or live; `name` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_detach(
    database: *mut AttachkitDatabase,
    name: *const c_char,
) -> AttachkitState {
    // SAFETY: per the caller's contract.
    let (Some(wrapper), Some(name)) = (unsafe { database_ref(database) }, unsafe { utf8(name) })
    else {
        return AttachkitState::Error;
    };
    match wrapper.database.detach(name) {
        Ok(_) => AttachkitState::Success,
        Err(_) => AttachkitState::Error,
    }
}

/// Frees a string returned by this library.
///
/// # Safety
///
/// `value` must be null or a string from this library not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn attachkit_free_string(value: *mut c_char) {
    if !value.is_null() {
        // SAFETY: the string came from `CString::into_raw`.
        drop(unsafe { CString::from_raw(value) });
    }
}
