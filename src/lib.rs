//! # Attachkit
//!
//! Pluggable storage-extension registration and attach dispatch.
//!
//! An external module registers a named storage extension with the runtime.
//! When a client attaches a database of that type, the runtime invokes the
//! extension's callbacks to produce a catalog and then a transaction
//! manager for the attached database.
//!
//! ## Features
//!
//! - Registry of extensions keyed by ATTACH `TYPE`
//! - Owned extra-info with a destructor that runs exactly once
//! - Per-dispatch call contexts with a scratch string cache
//! - Success-flag error signaling that never unwinds through callbacks
//! - A C ABI (`capi`) over the same protocol
//!
//! ## Example
//!
//! ```rust
//! use attachkit::config::DbConfig;
//! use attachkit::extension::StorageExtension;
//! use attachkit::models::{AttachInfo, AttachOptions};
//! use attachkit::runtime::Database;
//!
//! let config = DbConfig::new();
//! let extension = StorageExtension::new()
//!     .with_attach(|info| {
//!         let cache_mb = info.get_option_bigint("cache_mb").unwrap_or(64);
//!         if cache_mb <= 0 {
//!             info.set_error("cache_mb must be positive");
//!             return;
//!         }
//!         info.set_default_catalog();
//!     })
//!     .with_transaction(|info| info.set_default_transaction_manager());
//! config.add_storage_extension("memstore", extension)?;
//!
//! let db = Database::open(config);
//! let client = db.connect();
//! let attached = db.attach(
//!     &client,
//!     AttachInfo::new("scratch", ":memory:").with_option("cache_mb", 128),
//!     AttachOptions::for_type("memstore"),
//! )?;
//! assert_eq!(attached.catalog().catalog_type(), "default");
//! # Ok::<(), attachkit::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Only `capi` may use unsafe; it opts back in explicitly.
#![deny(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
#[allow(unsafe_code)]
pub mod capi;
pub mod config;
pub mod extension;
pub mod models;
pub mod observability;
pub mod runtime;

// Re-exports for convenience
pub use config::{DbConfig, RuntimeSettings};
pub use extension::{AttachHandle, CallbackKind, StorageExtension, TransactionHandle};
pub use models::{AttachInfo, AttachOptions, LogicalType, Value};
pub use runtime::{Attachment, Catalog, ClientContext, Database, TransactionManager};

/// Error type for attachkit operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty type name at registration, empty attach name |
/// | `CallbackNotSet` | Dispatch to a callback slot that was never set |
/// | `MissingProduct` | Callback reported success but produced nothing |
/// | `ExtensionReported` | Callback called `set_error` |
/// | `UnknownStorageType` | ATTACH names a type nobody registered |
/// | `AlreadyAttached` / `NotAttached` | Attach name collision, detach of unknown name |
/// | `Conversion` | Default coercion of an option value failed |
/// | `TransactionNotFound` | Commit/rollback of an unknown transaction |
/// | `OperationFailed` | Config I/O, TOML parsing, lock poisoning, observability init |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A dispatch reached an unset callback slot.
    ///
    /// Configuration error with fixed text; fatal to the statement.
    #[error("{callback} callback was not set for storage extension")]
    CallbackNotSet {
        /// The slot that was missing.
        callback: CallbackKind,
    },

    /// A callback reported success without producing its product.
    #[error("{callback} callback did not produce a {}", .callback.product())]
    MissingProduct {
        /// The slot whose product was missing.
        callback: CallbackKind,
    },

    /// The extension reported a failure via `set_error`.
    ///
    /// Displayed verbatim so the statement fails with the extension's text.
    #[error("{0}")]
    ExtensionReported(String),

    /// No extension is registered for the requested type.
    #[error("unknown storage extension type '{0}'")]
    UnknownStorageType(String),

    /// A database is already attached under this name.
    #[error("database '{0}' is already attached")]
    AlreadyAttached(String),

    /// No database is attached under this name.
    #[error("database '{0}' is not attached")]
    NotAttached(String),

    /// Default coercion failed.
    #[error("could not convert {value} to {target}")]
    Conversion {
        /// The source value, rendered.
        value: String,
        /// The requested type.
        target: LogicalType,
    },

    /// The transaction is not active in this manager.
    #[error("transaction {0} is not active")]
    TransactionNotFound(u64),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true for dispatch-layer configuration or defect errors.
    ///
    /// These are programmer errors in the extension, as opposed to failures
    /// the extension reported deliberately.
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::CallbackNotSet { .. } | Self::MissingProduct { .. }
        )
    }
}

/// Result type alias for attachkit operations.
pub type Result<T> = std::result::Result<T, Error>;
