//! Host runtime collaborators.
//!
//! Everything an extension produces or observes during dispatch: the client
//! context, the database being attached, catalogs and transaction managers.
//! [`Database`] drives attach and detach over a [`DbConfig`](crate::DbConfig).

mod catalog;
mod client_context;
mod database;
mod instance;
mod transaction;

pub use catalog::{Catalog, DEFAULT_SCHEMA, DefaultCatalog};
pub use client_context::{ClientContext, ClientContextHandle};
pub use database::AttachedDatabase;
pub use instance::{Attachment, Database};
pub use transaction::{DefaultTransactionManager, TransactionId, TransactionManager};
