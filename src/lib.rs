//! Zatar - allocator-aware containers
//!
//! Two allocation strategies behind one facade, and the containers that
//! draw all of their storage from it:
//! - `Region`: bump allocation over one reservation, bulk reset
//! - `TrackedHeap`: per-block free plus bulk release of everything live
//! - `OrderedMap` (AVL), `OrderedSet` and `HashTable` (open addressing)
//!   borrowing either

pub mod allocator;
pub mod collections;
pub mod config;
mod error;
pub mod logging;

// Re-export core types
pub use allocator::{Allocator, AllocatorMode, AllocatorStats, RawAllocator, Region, SharedAllocator, TrackedHeap};
pub use collections::{Comparator, HashTable, KeyEq, KeyHash, NaturalOrder, OrderedMap, OrderedSet, StdEq, StdHash};
pub use config::AllocatorConfig;
pub use error::AllocError;

/// Initialize logging from the environment; safe to call more than once
pub fn init() {
    logging::init();
}
