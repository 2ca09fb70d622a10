//! Storage extension registration and attach dispatch.
//!
//! An extension author builds a [`StorageExtension`], sets its callbacks and
//! optional extra-info, and registers it under a type name. When a client
//! attaches a database with that type, the runtime dispatches into the
//! callbacks:
//!
//! ```text
//! runtime ──▶ StorageExtension::attach
//!               ├── build AttachCallContext (success, no catalog)
//!               ├── callback(&mut AttachHandle)   ◀── accessors mutate context
//!               └── read back: error? ─▶ Err   no catalog? ─▶ Err   else Ok(catalog)
//! runtime ──▶ StorageExtension::create_transaction_manager
//!               └── same shape with TransactionHandle
//! ```
//!
//! Callbacks never return errors directly; they call `set_error` on the
//! handle and the dispatch function turns that into [`crate::Error`] after
//! the callback returns.

mod context;
mod dispatch;
mod entry;
mod handle;
mod options;
mod registry;

pub use context::StringCache;
pub use entry::{
    AttachCallback, ExtraInfoData, ExtraInfoDestructor, StorageExtension, TransactionCallback,
};
pub use handle::{AttachHandle, TransactionHandle};
pub use options::OptionStore;
pub use registry::StorageExtensionRegistry;

use std::fmt;

/// Which callback slot a dispatch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// The attach callback, producing a catalog.
    Attach,
    /// The transaction-manager callback, producing a transaction manager.
    CreateTransactionManager,
}

impl CallbackKind {
    /// Returns the metrics label for this slot.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::CreateTransactionManager => "create_transaction_manager",
        }
    }

    /// Returns the name of the product this slot must produce.
    #[must_use]
    pub const fn product(&self) -> &'static str {
        match self {
            Self::Attach => "catalog",
            Self::CreateTransactionManager => "transaction manager",
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attach => write!(f, "Attach"),
            Self::CreateTransactionManager => write!(f, "Create transaction manager"),
        }
    }
}
