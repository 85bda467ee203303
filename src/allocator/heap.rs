//! Tracked heap - general-purpose allocation with a live-pointer set
//!
//! Design: Every block comes from the global allocator and its payload
//! address is recorded in a `PtrTable`. That gives arena-style bulk
//! release (`reset`/drop) while still allowing per-block free and realloc.
//! Frees are checked against the table, so a double free or foreign
//! pointer is reported; callers still uphold the `unsafe` contract that no
//! reference into a freed block survives.

use super::header::BlockHeader;
use super::ptr_table::PtrTable;
use super::{AllocatorStats, RawAllocator};
use crate::logging;
use crate::AllocError;
use core::cell::{Cell, RefCell};
use core::ptr::NonNull;
use std::alloc::{self, Layout};

/// Default payload alignment
pub const DEFAULT_ALIGN: usize = BlockHeader::ALIGN;

pub struct TrackedHeap {
    table: RefCell<PtrTable>,
    bytes_live: Cell<usize>,
}

impl TrackedHeap {
    pub const fn new() -> Self {
        Self {
            table: RefCell::new(PtrTable::new()),
            bytes_live: Cell::new(0),
        }
    }

    /// Allocate `size` bytes with the default 16-byte alignment
    #[inline]
    pub fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.allocate_aligned(size, DEFAULT_ALIGN)
    }

    #[inline]
    pub fn allocate_zeroed(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        self.allocate_zeroed_aligned(size, DEFAULT_ALIGN)
    }

    pub fn allocate_aligned(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        self.allocate_with(size, align, false)
    }

    pub fn allocate_zeroed_aligned(
        &self,
        size: usize,
        align: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        self.allocate_with(size, align, true)
    }

    fn allocate_with(&self, size: usize, align: usize, zeroed: bool) -> Result<NonNull<u8>, AllocError> {
        let layout = BlockHeader::block_layout(size, align)?;

        let base = unsafe {
            if zeroed {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        };

        let base = NonNull::new(base).ok_or_else(|| {
            let err = AllocError::OutOfMemory { size };
            logging::log_allocation_failure(&err);
            err
        })?;

        let payload = unsafe { Self::finish_block(base, layout, size) };
        self.track(payload, size);
        Ok(payload)
    }

    /// Write the header and return the payload inside a fresh block
    unsafe fn finish_block(base: NonNull<u8>, layout: Layout, size: usize) -> NonNull<u8> {
        let payload = NonNull::new_unchecked(base.as_ptr().add(BlockHeader::payload_offset(layout.align())));
        BlockHeader::write(payload, BlockHeader::new(size, layout.align()));
        payload
    }

    fn track(&self, payload: NonNull<u8>, size: usize) {
        self.table.borrow_mut().insert(payload.as_ptr() as usize);
        self.bytes_live.set(self.bytes_live.get() + size);
        logging::log_allocation(size, payload.as_ptr());
    }

    /// Resize a block, possibly moving it
    ///
    /// `None` behaves as `allocate`. On failure the original block is left
    /// untouched and still tracked. If the address changes, the old address
    /// leaves the table and the new one enters it.
    ///
    /// # Safety
    ///
    /// No reference into the block behind `ptr` may be alive: the block can
    /// be moved and the old one released. Pointers this heap never handed
    /// out are rejected with `UntrackedPointer`.
    pub unsafe fn grow_or_relocate(
        &self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let Some(ptr) = ptr else {
            return self.allocate(new_size);
        };

        if !self.owns(ptr) {
            return Err(AllocError::UntrackedPointer);
        }

        let header = BlockHeader::read(ptr);
        let old_layout = header.layout()?;
        let new_layout = BlockHeader::block_layout(new_size, header.align)?;

        let new_base = alloc::realloc(header.base_of(ptr), old_layout, new_layout.size());
        let new_base = NonNull::new(new_base).ok_or_else(|| {
            let err = AllocError::OutOfMemory { size: new_size };
            logging::log_allocation_failure(&err);
            err
        })?;

        let new_ptr = Self::finish_block(new_base, new_layout, new_size);

        if new_ptr != ptr {
            let mut table = self.table.borrow_mut();
            table.remove(ptr.as_ptr() as usize);
            table.insert(new_ptr.as_ptr() as usize);
        }

        self.bytes_live.set(self.bytes_live.get() - header.size + new_size);
        logging::log_allocation(new_size, new_ptr.as_ptr());
        Ok(new_ptr)
    }

    /// Release one block and tombstone its table slot
    ///
    /// Double frees and foreign pointers are reported as `UntrackedPointer`.
    ///
    /// # Safety
    ///
    /// No reference into the block behind `ptr` may be alive, and nothing
    /// may use `ptr` afterwards. The pointer table only proves the block is
    /// live, not that it is unused.
    ///
    /// ```compile_fail,E0133
    /// let heap = zatar::TrackedHeap::new();
    /// let ptr = heap.allocate(16).unwrap();
    /// heap.free_one(ptr).unwrap();
    /// ```
    pub unsafe fn free_one(&self, ptr: NonNull<u8>) -> Result<(), AllocError> {
        if !self.table.borrow_mut().remove(ptr.as_ptr() as usize) {
            return Err(AllocError::UntrackedPointer);
        }

        let header = Self::release_block(ptr);
        self.bytes_live.set(self.bytes_live.get() - header.size);
        Ok(())
    }

    /// Deallocate the block behind a payload that was tracked by a heap
    unsafe fn release_block(payload: NonNull<u8>) -> BlockHeader {
        let header = BlockHeader::read(payload);
        let layout = Layout::from_size_align_unchecked(
            BlockHeader::payload_offset(header.align) + header.size,
            header.align,
        );
        alloc::dealloc(header.base_of(payload), layout);
        logging::log_deallocation(payload.as_ptr());
        header
    }

    /// True if `ptr` is a live block of this heap
    #[inline]
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        self.table.borrow().contains(ptr.as_ptr() as usize)
    }

    /// Free every tracked block; returns how many were released
    fn release_all(&mut self) -> usize {
        let mut released = 0;

        for addr in self.table.get_mut().iter() {
            // Tracked addresses are always payloads of live blocks
            unsafe { Self::release_block(NonNull::new_unchecked(addr as *mut u8)) };
            released += 1;
        }

        self.bytes_live.set(0);
        released
    }

    /// Free every tracked block, keep the table's capacity for reuse
    pub fn reset(&mut self) {
        let _timer = logging::perf::track("heap_reset");
        let released = self.release_all();
        self.table.get_mut().clear();
        logging::log_heap_release(released, false);
    }

    /// Free every tracked block and the table itself (same as dropping)
    pub fn destroy(self) {
        drop(self);
    }

    /// Live blocks
    #[inline]
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-empty table slots (live + tombstones)
    #[inline]
    pub fn occupied(&self) -> usize {
        self.table.borrow().occupied()
    }

    #[inline]
    pub fn slot_capacity(&self) -> usize {
        self.table.borrow().capacity()
    }

    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            bytes_in_use: self.bytes_live.get(),
            bytes_reserved: self.bytes_live.get(),
            live_allocations: self.len(),
        }
    }
}

impl Default for TrackedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrackedHeap {
    fn drop(&mut self) {
        let released = self.release_all();
        self.table.get_mut().release_storage();
        logging::log_heap_release(released, true);
    }
}

impl RawAllocator for TrackedHeap {
    #[inline]
    fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        self.allocate_aligned(size, align)
    }

    #[inline]
    fn allocate_zeroed(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        self.allocate_zeroed_aligned(size, align)
    }

    #[inline]
    unsafe fn free_one(&self, ptr: NonNull<u8>) -> Result<(), AllocError> {
        TrackedHeap::free_one(self, ptr)
    }

    #[inline]
    fn supports_free(&self) -> bool {
        true
    }
}
