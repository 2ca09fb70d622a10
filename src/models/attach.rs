//! Attach statement inputs.

use super::Value;
use std::collections::HashMap;

/// The raw attach request as parsed from an ATTACH statement.
///
/// `options` holds the options declared on the statement (or in an
/// `[[attach]]` config block). Extensions may rewrite `path`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachInfo {
    /// Attach name (the alias the catalog is installed under).
    pub name: String,
    /// Database path.
    pub path: String,
    /// Declarative options.
    pub options: HashMap<String, Value>,
}

impl AttachInfo {
    /// Creates an attach info for `path` attached as `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            options: HashMap::new(),
        }
    }

    /// Adds a declarative option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Options resolved by the runtime at the call site.
///
/// `db_type` selects the storage extension. Entries in `options` shadow the
/// declarative options in [`AttachInfo`] with the same key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachOptions {
    /// Storage extension type name (the ATTACH `TYPE`).
    pub db_type: Option<String>,
    /// Call-site options.
    pub options: HashMap<String, Value>,
}

impl AttachOptions {
    /// Creates options selecting the given storage type.
    #[must_use]
    pub fn for_type(db_type: impl Into<String>) -> Self {
        Self {
            db_type: Some(db_type.into()),
            options: HashMap::new(),
        }
    }

    /// Adds a call-site option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}
