//! Transaction manager products.

use super::AttachedDatabase;
use crate::{Error, Result};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Identifier of a transaction within one transaction manager.
pub type TransactionId = u64;

/// Transaction coordinator for an attached database.
pub trait TransactionManager: fmt::Debug + Send + Sync {
    /// Returns the database this manager coordinates.
    fn database(&self) -> &Arc<AttachedDatabase>;

    /// Starts a transaction.
    fn begin(&self) -> Result<TransactionId>;

    /// Commits an active transaction.
    fn commit(&self, id: TransactionId) -> Result<()>;

    /// Rolls back an active transaction.
    fn rollback(&self, id: TransactionId) -> Result<()>;

    /// Returns the number of active transactions.
    fn active_count(&self) -> Result<usize>;

    /// Returns `self` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// The runtime's built-in transaction manager.
#[derive(Debug)]
pub struct DefaultTransactionManager {
    database: Arc<AttachedDatabase>,
    next_id: AtomicU64,
    active: Mutex<HashSet<TransactionId>>,
}

impl DefaultTransactionManager {
    /// Creates a manager bound to `database`.
    #[must_use]
    pub fn new(database: Arc<AttachedDatabase>) -> Self {
        Self {
            database,
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashSet::new()),
        }
    }

    fn finish(&self, id: TransactionId, operation: &str) -> Result<()> {
        let mut active = self.active.lock().map_err(|e| Error::OperationFailed {
            operation: operation.to_string(),
            cause: e.to_string(),
        })?;
        if active.remove(&id) {
            Ok(())
        } else {
            Err(Error::TransactionNotFound(id))
        }
    }
}

impl TransactionManager for DefaultTransactionManager {
    fn database(&self) -> &Arc<AttachedDatabase> {
        &self.database
    }

    fn begin(&self) -> Result<TransactionId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut active = self.active.lock().map_err(|e| Error::OperationFailed {
            operation: "transaction_begin".to_string(),
            cause: e.to_string(),
        })?;
        active.insert(id);
        Ok(id)
    }

    fn commit(&self, id: TransactionId) -> Result<()> {
        self.finish(id, "transaction_commit")
    }

    fn rollback(&self, id: TransactionId) -> Result<()> {
        self.finish(id, "transaction_rollback")
    }

    fn active_count(&self) -> Result<usize> {
        let active = self.active.lock().map_err(|e| Error::OperationFailed {
            operation: "transaction_active_count".to_string(),
            cause: e.to_string(),
        })?;
        Ok(active.len())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
