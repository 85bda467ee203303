//! Bump cursor - O(1) fast path for region allocation
//!
//! Design: Offsets instead of raw pointers so the region keeps pointer
//! provenance in one place (`base`). The cursor lives in a `Cell` so
//! allocation needs only `&self`.

use super::header::BlockHeader;
use core::cell::Cell;

/// Cursor state - `0 <= offset <= limit`
pub struct BumpCursor {
    offset: Cell<usize>,
    limit: usize,
}

impl BumpCursor {
    #[inline]
    pub const fn new(limit: usize) -> Self {
        Self {
            offset: Cell::new(0),
            limit,
        }
    }

    /// Reserve room for a header plus `size` bytes aligned to `align`
    ///
    /// `base` is the absolute address of the region start; alignment is
    /// computed on absolute addresses. Returns the payload offset, or
    /// `None` if the block would cross `limit` (cursor left untouched).
    #[inline(always)]
    pub fn try_bump(&self, base: usize, size: usize, align: usize) -> Option<usize> {
        debug_assert!(align.is_power_of_two(), "alignment must be power of 2");

        let start = base
            .checked_add(self.offset.get())?
            .checked_add(BlockHeader::SIZE)?;
        let payload = align_up(start, align)? - base;
        let end = payload.checked_add(size)?;

        if end <= self.limit {
            self.offset.set(end);
            Some(payload)
        } else {
            None
        }
    }

    /// Rewind to the start of the region
    #[inline]
    pub fn rewind(&mut self) {
        self.offset.set(0);
    }

    /// Bytes consumed so far (including headers and padding)
    #[inline]
    pub fn used(&self) -> usize {
        self.offset.get()
    }

    /// Remaining capacity in the region
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.offset.get())
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Align address upward to next multiple of alignment
///
/// Uses bit manipulation for branch-free execution:
/// - Add (align - 1) to round up
/// - Mask with !(align - 1) to align down
#[inline(always)]
pub const fn align_up(addr: usize, align: usize) -> Option<usize> {
    match addr.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(9, 8), Some(16));
        assert_eq!(align_up(usize::MAX, 8), None);
    }

    #[test]
    fn bump_leaves_room_for_header() {
        let cursor = BumpCursor::new(1024);

        let first = cursor.try_bump(0, 32, 16).expect("first");
        assert_eq!(first, 16);
        assert_eq!(cursor.used(), 48);

        let second = cursor.try_bump(0, 8, 16).expect("second");
        assert_eq!(second, 64);
    }

    #[test]
    fn bump_fails_when_exhausted() {
        let cursor = BumpCursor::new(64);

        cursor.try_bump(0, 16, 16).expect("fits");
        assert!(cursor.try_bump(0, 32, 16).is_none());

        // Failed bump must not move the cursor
        assert_eq!(cursor.used(), 32);
        assert_eq!(cursor.remaining(), 32);
    }

    #[test]
    fn rewind_resets_offset() {
        let mut cursor = BumpCursor::new(256);
        let before = cursor.try_bump(0, 64, 16).expect("alloc");
        cursor.rewind();
        assert_eq!(cursor.used(), 0);
        assert_eq!(cursor.try_bump(0, 64, 16), Some(before));
    }
}
