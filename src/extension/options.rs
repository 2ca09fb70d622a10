//! Merged read-only view over attach options.

use crate::models::{AttachInfo, AttachOptions, Value};
use std::collections::HashMap;

/// Option lookup with call-site priority.
///
/// Call-site options shadow declarative options with the same key. A missing
/// key is not an error; callers apply their own default.
#[derive(Debug, Clone, Copy)]
pub struct OptionStore<'a> {
    call_site: &'a HashMap<String, Value>,
    declared: &'a HashMap<String, Value>,
}

impl<'a> OptionStore<'a> {
    /// Creates a store over the two option mappings.
    #[must_use]
    pub const fn new(
        call_site: &'a HashMap<String, Value>,
        declared: &'a HashMap<String, Value>,
    ) -> Self {
        Self {
            call_site,
            declared,
        }
    }

    /// Creates a store over an attach request.
    #[must_use]
    pub const fn for_attach(options: &'a AttachOptions, info: &'a AttachInfo) -> Self {
        Self::new(&options.options, &info.options)
    }

    /// Returns the raw value for `key`, call-site first.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<&'a Value> {
        self.call_site
            .get(key)
            .or_else(|| self.declared.get(key))
    }

    /// Returns the value as text, or `None` if absent or not convertible.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.resolve(key)?.cast_as_varchar().ok()
    }

    /// Returns the value as a boolean, or `None` if absent or not convertible.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.resolve(key)?.cast_as_boolean().ok()
    }

    /// Returns the value as an integer, or `None` if absent or not convertible.
    #[must_use]
    pub fn get_int64(&self, key: &str) -> Option<i64> {
        self.resolve(key)?.cast_as_bigint().ok()
    }

    /// Returns the value as a real, or `None` if absent or not convertible.
    #[must_use]
    pub fn get_double(&self, key: &str) -> Option<f64> {
        self.resolve(key)?.cast_as_double().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_site_shadows_declared() {
        let options = AttachOptions::default().with_option("k", "call");
        let info = AttachInfo::new("db", ":memory:")
            .with_option("k", "decl")
            .with_option("only_decl", 3);
        let store = OptionStore::for_attach(&options, &info);

        assert_eq!(store.resolve("k"), Some(&Value::from("call")));
        assert_eq!(store.get_int64("only_decl"), Some(3));
    }

    #[test]
    fn test_absent_key() {
        let options = AttachOptions::default();
        let info = AttachInfo::default();
        let store = OptionStore::for_attach(&options, &info);

        assert!(store.resolve("missing").is_none());
        assert!(store.get_string("missing").is_none());
        assert!(store.get_bool("missing").is_none());
        assert!(store.get_int64("missing").is_none());
        assert!(store.get_double("missing").is_none());
    }

    #[test]
    fn test_unconvertible_is_absent() {
        let options = AttachOptions::default().with_option("n", "not a number");
        let info = AttachInfo::default();
        let store = OptionStore::for_attach(&options, &info);

        assert_eq!(store.get_string("n").as_deref(), Some("not a number"));
        assert!(store.get_int64("n").is_none());
        assert!(store.get_double("n").is_none());
        assert!(store.get_bool("n").is_none());
    }
}
