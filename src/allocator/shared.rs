//! Shared allocator - external serialization for multi-threaded callers
//!
//! The allocators themselves are single-threaded (`!Sync`). Callers that
//! need one allocator from several threads go through this wrapper, which
//! holds the lock for the whole closure so containers built inside it can
//! never outlive the critical section.

use super::{Allocator, AllocatorStats};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
pub struct SharedAllocator {
    inner: Arc<Mutex<Allocator>>,
}

impl SharedAllocator {
    pub fn new(allocator: Allocator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(allocator)),
        }
    }

    /// Run `f` with exclusive access to the allocator
    pub fn with<R>(&self, f: impl FnOnce(&Allocator) -> R) -> R {
        let guard = self.inner.lock();
        f(&guard)
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Allocator) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn stats(&self) -> AllocatorStats {
        self.inner.lock().stats()
    }

    /// Take the allocator back once every other handle is gone
    pub fn try_unwrap(self) -> Result<Allocator, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<Allocator> for SharedAllocator {
    fn from(allocator: Allocator) -> Self {
        Self::new(allocator)
    }
}
