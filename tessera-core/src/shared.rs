//! Thread-safe handle around a [`Registry`].
//!
//! Mutations run one at a time under the write lock; reads share the read
//! lock and always observe every mutation that completed before them.
//! A poisoned lock is recovered rather than propagated. Each registry
//! operation verifies before it writes, so a single operation is never left
//! half-applied; a `write` closure that runs several operations and panics
//! between them keeps the ones that already returned.

use std::sync::{Arc, PoisonError, RwLock};

use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Run `f` with exclusive access. No other read or write interleaves with it.
    pub fn write<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    /// Run `f` with shared access.
    pub fn read<T>(&self, f: impl FnOnce(&Registry) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&*guard)
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> Registry {
        self.read(Registry::clone)
    }
}

impl From<Registry> for SharedRegistry {
    fn from(registry: Registry) -> Self {
        Self::new(registry)
    }
}
