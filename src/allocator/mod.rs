//! Memory allocators - region and tracked heap behind one facade
//!
//! Design: Two strategies, one interface:
//! 1. `Region` - bump allocation over a fixed virtual reservation, bulk reset only
//! 2. `TrackedHeap` - global allocator plus a set of live pointers, per-block
//!    free and bulk release
//! 3. `Allocator` - closed enum over both, so containers never care which
//!
//! Allocation takes `&self`; `reset` takes `&mut self` and `destroy` takes
//! `self`. Containers borrow their allocator, so resetting or destroying it
//! while a container is alive does not compile.

mod arena;
mod bump;
mod header;
mod heap;
mod os;
mod ptr_table;
mod shared;

#[cfg(test)]
mod tests;

pub use arena::Region;
pub use bump::BumpCursor;
pub use header::BlockHeader;
pub use heap::{TrackedHeap, DEFAULT_ALIGN};
pub use ptr_table::{PtrTable, MAX_LOAD_FACTOR, MIN_CAPACITY};
pub use shared::SharedAllocator;

use crate::config::AllocatorConfig;
use crate::logging::debug;
use crate::AllocError;
use core::ptr::NonNull;

/// Minimal allocation interface containers are generic over
pub trait RawAllocator {
    fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError>;

    fn allocate_zeroed(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError>;

    /// Release one block; a no-op for strategies without per-block free
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator, and no reference into its block
    /// may outlive the call.
    unsafe fn free_one(&self, ptr: NonNull<u8>) -> Result<(), AllocError>;

    /// Whether `free_one` actually returns memory
    fn supports_free(&self) -> bool;
}

/// Which strategy an `Allocator` uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocatorMode {
    Heap,
    Region,
}

/// Allocator statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorStats {
    /// Bytes handed out and not yet released
    pub bytes_in_use: usize,
    /// Bytes reserved from the OS (region capacity, or live heap bytes)
    pub bytes_reserved: usize,
    /// Blocks handed out and not yet released
    pub live_allocations: usize,
}

/// Strategy-agnostic allocator
pub enum Allocator {
    Region(Region),
    Heap(TrackedHeap),
}

impl Allocator {
    /// Tracked heap allocator
    pub fn heap() -> Self {
        Self::Heap(TrackedHeap::new())
    }

    /// Region allocator reserving `capacity` bytes
    pub fn region(capacity: usize) -> Result<Self, AllocError> {
        Region::new(capacity).map(Self::Region)
    }

    /// Allocator of the given mode with default configuration
    pub fn new(mode: AllocatorMode) -> Result<Self, AllocError> {
        Self::from_config(&AllocatorConfig {
            mode,
            ..AllocatorConfig::default()
        })
    }

    pub fn from_config(config: &AllocatorConfig) -> Result<Self, AllocError> {
        debug!(mode = ?config.mode, capacity = config.region_capacity, "Creating allocator");

        match config.mode {
            AllocatorMode::Heap => Ok(Self::heap()),
            AllocatorMode::Region => Self::region(config.region_capacity),
        }
    }

    pub fn mode(&self) -> AllocatorMode {
        match self {
            Self::Region(_) => AllocatorMode::Region,
            Self::Heap(_) => AllocatorMode::Heap,
        }
    }

    #[inline]
    pub fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        match self {
            Self::Region(region) => region.allocate(size, align),
            Self::Heap(heap) => heap.allocate_aligned(size, align),
        }
    }

    #[inline]
    pub fn allocate_zeroed(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        match self {
            Self::Region(region) => region.allocate_zeroed(size, align),
            Self::Heap(heap) => heap.allocate_zeroed_aligned(size, align),
        }
    }

    /// Grow a block in place when possible, otherwise move it
    ///
    /// `None` allocates a fresh block.
    ///
    /// # Safety
    ///
    /// No reference into the block behind `ptr` may be alive; the block can
    /// move and the old one be released.
    ///
    /// ```compile_fail,E0133
    /// let alloc = zatar::Allocator::heap();
    /// let ptr = alloc.allocate(16, 16).unwrap();
    /// alloc.grow_or_relocate(Some(ptr), 64).unwrap();
    /// ```
    pub unsafe fn grow_or_relocate(
        &self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        match self {
            Self::Region(region) => region.grow_or_relocate(ptr, new_size),
            Self::Heap(heap) => heap.grow_or_relocate(ptr, new_size),
        }
    }

    /// Release one block (no-op in region mode)
    ///
    /// # Safety
    ///
    /// Same contract as `RawAllocator::free_one`.
    #[inline]
    pub unsafe fn free_one(&self, ptr: NonNull<u8>) -> Result<(), AllocError> {
        match self {
            Self::Region(_) => Ok(()),
            Self::Heap(heap) => heap.free_one(ptr),
        }
    }

    /// Release everything handed out so far, keep the allocator usable
    pub fn reset(&mut self) {
        match self {
            Self::Region(region) => region.reset(),
            Self::Heap(heap) => heap.reset(),
        }
    }

    /// Release everything including the allocator's own storage
    pub fn destroy(self) {
        match self {
            Self::Region(region) => region.destroy(),
            Self::Heap(heap) => heap.destroy(),
        }
    }

    pub fn stats(&self) -> AllocatorStats {
        match self {
            Self::Region(region) => region.stats(),
            Self::Heap(heap) => heap.stats(),
        }
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::heap()
    }
}

impl RawAllocator for Allocator {
    #[inline]
    fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        Allocator::allocate(self, size, align)
    }

    #[inline]
    fn allocate_zeroed(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        Allocator::allocate_zeroed(self, size, align)
    }

    #[inline]
    unsafe fn free_one(&self, ptr: NonNull<u8>) -> Result<(), AllocError> {
        Allocator::free_one(self, ptr)
    }

    #[inline]
    fn supports_free(&self) -> bool {
        matches!(self, Self::Heap(_))
    }
}
