//! Catalog products.

use super::AttachedDatabase;
use crate::{Error, Result};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Name of the schema every default catalog starts with.
pub const DEFAULT_SCHEMA: &str = "main";

/// Catalog interface installed for an attached database.
///
/// Extensions may return their own implementation; the runtime only relies
/// on this trait.
pub trait Catalog: fmt::Debug + Send + Sync {
    /// Returns the catalog kind, e.g. `"default"`.
    fn catalog_type(&self) -> &str;

    /// Returns the database this catalog is bound to.
    fn database(&self) -> &Arc<AttachedDatabase>;

    /// Lists schema names.
    fn schema_names(&self) -> Result<Vec<String>>;

    /// Returns `self` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// The runtime's built-in catalog.
#[derive(Debug)]
pub struct DefaultCatalog {
    database: Arc<AttachedDatabase>,
    schemas: RwLock<BTreeSet<String>>,
}

impl DefaultCatalog {
    /// Catalog type name reported by [`Catalog::catalog_type`].
    pub const TYPE_NAME: &'static str = "default";

    /// Creates a catalog bound to `database` holding the `main` schema.
    #[must_use]
    pub fn new(database: Arc<AttachedDatabase>) -> Self {
        let mut schemas = BTreeSet::new();
        schemas.insert(DEFAULT_SCHEMA.to_string());
        Self {
            database,
            schemas: RwLock::new(schemas),
        }
    }

    /// Creates a schema. Returns false if it already existed.
    pub fn create_schema(&self, name: &str) -> Result<bool> {
        let mut schemas = self.schemas.write().map_err(|e| Error::OperationFailed {
            operation: "catalog_create_schema".to_string(),
            cause: e.to_string(),
        })?;
        Ok(schemas.insert(name.to_string()))
    }
}

impl Catalog for DefaultCatalog {
    fn catalog_type(&self) -> &str {
        Self::TYPE_NAME
    }

    fn database(&self) -> &Arc<AttachedDatabase> {
        &self.database
    }

    fn schema_names(&self) -> Result<Vec<String>> {
        let schemas = self.schemas.read().map_err(|e| Error::OperationFailed {
            operation: "catalog_schema_names".to_string(),
            cause: e.to_string(),
        })?;
        Ok(schemas.iter().cloned().collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_has_main_schema() {
        let db = Arc::new(AttachedDatabase::new("db", "test"));
        let catalog = DefaultCatalog::new(Arc::clone(&db));
        assert_eq!(catalog.catalog_type(), "default");
        assert_eq!(catalog.database().id(), db.id());
        assert_eq!(catalog.schema_names().unwrap(), vec!["main".to_string()]);
    }

    #[test]
    fn test_create_schema() {
        let catalog = DefaultCatalog::new(Arc::new(AttachedDatabase::new("db", "test")));
        assert!(catalog.create_schema("analytics").unwrap());
        assert!(!catalog.create_schema("analytics").unwrap());
        assert_eq!(catalog.schema_names().unwrap().len(), 2);
    }
}
