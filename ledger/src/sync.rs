//! Single-writer handle for concurrent hosts.
//!
//! The non-fungible step of every mutation touches allocator state shared
//! by all accounts, so the whole ledger sits behind one lock. Writers take
//! it exclusively for the full call; readers share it.

use parking_lot::RwLock;
use std::sync::Arc;

/// A cloneable, lock-guarded ledger (or anything wrapping one).
#[derive(Debug, Default)]
pub struct Shared<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Runs `f` with shared access.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs `f` with exclusive access. The lock is held until `f` returns,
    /// so no reader observes a half-applied operation.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.write())
    }
}
