//! Region allocator - one reservation, bump allocation, bulk reset
//!
//! Design: Reserve a large virtual range up front (pages are only backed
//! once touched), hand out blocks by advancing a cursor, never free a
//! single block. `reset` rewinds the cursor; dropping releases the range.

use super::bump::BumpCursor;
use super::header::BlockHeader;
use super::{os, AllocatorStats, RawAllocator};
use crate::logging::{self, debug};
use crate::AllocError;
use core::cell::Cell;
use core::ptr::NonNull;

/// Bump-pointer region over a fixed virtual reservation
///
/// Invariant: `base <= base + cursor <= base + capacity`, and every block
/// handed out lies inside `[base, base + cursor)`.
pub struct Region {
    base: NonNull<u8>,
    cursor: BumpCursor,
    blocks: Cell<usize>,
}

// Safety: the region exclusively owns its reservation; moving it to another
// thread moves that ownership. It stays !Sync through the `Cell`s.
unsafe impl Send for Region {}

impl Region {
    /// Reserve `capacity` bytes of address space
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        let base = os::reserve(capacity).ok_or(AllocError::ReserveFailed { capacity })?;

        debug!(
            event = "region_create",
            capacity,
            base = ?base.as_ptr(),
            "Region reserved"
        );

        Ok(Self {
            base,
            cursor: BumpCursor::new(capacity),
            blocks: Cell::new(0),
        })
    }

    /// Allocate `size` bytes aligned to at least `align` (and 16)
    pub fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        if !align.is_power_of_two() {
            return Err(AllocError::InvalidLayout { size, align });
        }

        self.bump(size, BlockHeader::effective_align(align)).ok_or_else(|| {
            let err = AllocError::Exhausted {
                requested: size,
                remaining: self.cursor.remaining(),
            };
            logging::log_allocation_failure(&err);
            err
        })
    }

    /// Allocate and zero-fill; memory reused after `reset` is not zero
    pub fn allocate_zeroed(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.allocate(size, align)?;
        unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    /// Fast path, no logging on failure
    #[inline]
    fn bump(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let offset = self.cursor.try_bump(self.base.as_ptr() as usize, size, align)?;

        unsafe {
            let payload = NonNull::new_unchecked(self.base.as_ptr().add(offset));
            BlockHeader::write(payload, BlockHeader::new(size, align));
            self.blocks.set(self.blocks.get() + 1);
            logging::log_allocation(size, payload.as_ptr());
            Some(payload)
        }
    }

    /// Return `ptr` if its block already holds `new_size` bytes, otherwise
    /// copy it into a fresh block (double the size when room allows).
    ///
    /// `None` behaves as `allocate`. The old block is never reclaimed.
    ///
    /// # Safety
    ///
    /// No mutable reference into the block behind `ptr` may be alive while
    /// its bytes are copied, and callers must switch to the returned pointer.
    pub unsafe fn grow_or_relocate(
        &self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let Some(ptr) = ptr else {
            return self.allocate(new_size, BlockHeader::ALIGN);
        };

        let offset = self.offset_of(ptr).ok_or(AllocError::UntrackedPointer)?;
        let header = BlockHeader::read(ptr);

        // Clamp to the cursor so a stale header can never copy past it
        let old_size = header.size.min(self.cursor.used() - offset);

        if new_size <= old_size {
            return Ok(ptr);
        }

        // A pointer into the middle of a block reads a garbage header
        let align = BlockHeader::effective_align(header.align);
        if !align.is_power_of_two() {
            return Err(AllocError::UntrackedPointer);
        }

        let new_ptr = match new_size.checked_mul(2).and_then(|slack| self.bump(slack, align)) {
            Some(p) => p,
            None => self.allocate(new_size, align)?,
        };

        core::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size.min(new_size));

        Ok(new_ptr)
    }

    /// Offset of a payload pointer if it could have come from this region
    fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = (ptr.as_ptr() as usize).checked_sub(self.base.as_ptr() as usize)?;

        let in_bounds = offset >= BlockHeader::SIZE && offset <= self.cursor.used();
        let aligned = offset % BlockHeader::ALIGN == 0;

        (in_bounds && aligned).then_some(offset)
    }

    /// True if `ptr` lies in the allocated part of the region
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.offset_of(ptr).is_some()
    }

    /// Rewind the cursor; every earlier block becomes logically dead
    ///
    /// Taking `&mut self` means no container can still be borrowing the region.
    pub fn reset(&mut self) {
        logging::log_region_reset(self.cursor.used());
        self.cursor.rewind();
        self.blocks.set(0);
    }

    /// Release the reservation (same as dropping)
    pub fn destroy(self) {
        drop(self);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cursor.limit()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.cursor.used()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            bytes_in_use: self.cursor.used(),
            bytes_reserved: self.cursor.limit(),
            live_allocations: self.blocks.get(),
        }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        logging::log_region_destroy(self.cursor.limit());
        unsafe { os::release(self.base, self.cursor.limit()) };
    }
}

impl RawAllocator for Region {
    #[inline]
    fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        Region::allocate(self, size, align)
    }

    #[inline]
    fn allocate_zeroed(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        Region::allocate_zeroed(self, size, align)
    }

    /// Per-block free is not supported; the block stays until `reset`
    #[inline]
    unsafe fn free_one(&self, _ptr: NonNull<u8>) -> Result<(), AllocError> {
        Ok(())
    }

    #[inline]
    fn supports_free(&self) -> bool {
        false
    }
}
