//! Attached database identity.

use uuid::Uuid;

/// A database being attached (or already attached) to the runtime.
///
/// Catalogs and transaction managers produced by extensions are bound to
/// one of these.
#[derive(Debug)]
pub struct AttachedDatabase {
    id: Uuid,
    name: String,
    storage_type: String,
}

impl AttachedDatabase {
    /// Creates a new attached database with a time-ordered id.
    #[must_use]
    pub fn new(name: impl Into<String>, storage_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            storage_type: storage_type.into(),
        }
    }

    /// Returns the unique database id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the attach name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage extension type this database was attached with.
    #[must_use]
    pub fn storage_type(&self) -> &str {
        &self.storage_type
    }
}
