//! Client connection context.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-connection state of the host runtime.
///
/// Opaque to extensions; they only ever see a [`ClientContextHandle`].
#[derive(Debug)]
pub struct ClientContext {
    connection_id: u64,
}

impl ClientContext {
    /// Creates a context with a fresh connection id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connection_id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns the connection id.
    #[must_use]
    pub const fn connection_id(&self) -> u64 {
        self.connection_id
    }
}

impl Default for ClientContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Lightweight wrapper handed to extensions.
///
/// A new wrapper is built on every request; dropping it never affects the
/// underlying context.
#[derive(Debug, Clone)]
pub struct ClientContextHandle {
    context: Arc<ClientContext>,
}

impl ClientContextHandle {
    /// Wraps a client context reference.
    #[must_use]
    pub fn new(context: &Arc<ClientContext>) -> Self {
        Self {
            context: Arc::clone(context),
        }
    }

    /// Returns the connection id of the wrapped context.
    #[must_use]
    pub fn connection_id(&self) -> u64 {
        self.context.connection_id()
    }

    /// Returns true if both handles wrap the same context.
    #[must_use]
    pub fn same_context(&self, other: &Arc<ClientContext>) -> bool {
        Arc::ptr_eq(&self.context, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        let a = ClientContext::new();
        let b = ClientContext::new();
        assert_ne!(a.connection_id(), b.connection_id());
    }

    #[test]
    fn test_handle_wraps_context() {
        let context = Arc::new(ClientContext::new());
        let handle = ClientContextHandle::new(&context);
        assert!(handle.same_context(&context));
        assert_eq!(handle.connection_id(), context.connection_id());
        drop(handle);
        assert_eq!(Arc::strong_count(&context), 1);
    }
}
