//! Block metadata - size header prefixed before every payload
//!
//! Design: One 16-byte header shared by both strategies.
//! - Region reads `size` to decide whether grow-or-relocate can stay in place
//! - Tracked heap rebuilds the deallocation `Layout` from `size` and `align`
//!
//! Layout of a block:
//!
//! ```text
//! base            payload - 16     payload
//!  |   padding    | BlockHeader    | user bytes ...
//! ```

use crate::AllocError;
use core::ptr::NonNull;
use std::alloc::Layout;

/// Header (16 bytes on every target) immediately before the payload
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub size: usize,
    pub align: usize,
}

impl BlockHeader {
    pub const SIZE: usize = core::mem::size_of::<Self>();
    pub const ALIGN: usize = core::mem::align_of::<Self>();

    #[inline]
    pub const fn new(size: usize, align: usize) -> Self {
        Self { size, align }
    }

    /// Payload alignment actually used: never below the header's own
    #[inline]
    pub fn effective_align(align: usize) -> usize {
        align.max(Self::ALIGN)
    }

    /// Distance from block base to payload for an effective alignment
    #[inline]
    pub const fn payload_offset(align: usize) -> usize {
        if align > Self::SIZE {
            align
        } else {
            Self::SIZE
        }
    }

    /// Layout of the whole block (padding + header + payload)
    pub fn block_layout(size: usize, align: usize) -> Result<Layout, AllocError> {
        if !align.is_power_of_two() {
            return Err(AllocError::InvalidLayout { size, align });
        }

        let align = Self::effective_align(align);
        let total = Self::payload_offset(align)
            .checked_add(size)
            .ok_or(AllocError::InvalidLayout { size, align })?;

        Layout::from_size_align(total, align).map_err(|_| AllocError::InvalidLayout { size, align })
    }

    /// Layout this header describes
    #[inline]
    pub fn layout(&self) -> Result<Layout, AllocError> {
        Self::block_layout(self.size, self.align)
    }

    /// Write header in front of `payload`
    ///
    /// # Safety
    /// The `SIZE` bytes before `payload` must be writable and belong to the block.
    #[inline]
    pub unsafe fn write(payload: NonNull<u8>, header: Self) {
        payload.as_ptr().sub(Self::SIZE).cast::<Self>().write(header);
    }

    /// Read header in front of `payload`
    ///
    /// # Safety
    /// `payload` must have been produced together with a `write` of its header.
    #[inline]
    pub unsafe fn read(payload: NonNull<u8>) -> Self {
        payload.as_ptr().sub(Self::SIZE).cast::<Self>().read()
    }

    /// Start of the underlying block for a payload described by `self`
    ///
    /// # Safety
    /// `payload` must be the payload this header was written for.
    #[inline]
    pub unsafe fn base_of(&self, payload: NonNull<u8>) -> *mut u8 {
        payload.as_ptr().sub(Self::payload_offset(Self::effective_align(self.align)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_sixteen_bytes() {
        assert_eq!(BlockHeader::SIZE, 16);
        assert_eq!(BlockHeader::ALIGN, 16);
    }

    #[test]
    fn payload_offset_covers_header() {
        assert_eq!(BlockHeader::payload_offset(16), 16);
        assert_eq!(BlockHeader::payload_offset(64), 64);
    }

    #[test]
    fn block_layout_rejects_bad_alignment() {
        assert_eq!(
            BlockHeader::block_layout(8, 3),
            Err(AllocError::InvalidLayout { size: 8, align: 3 })
        );
        assert!(BlockHeader::block_layout(usize::MAX, 8).is_err());
    }

    #[test]
    fn block_layout_includes_header() {
        let layout = BlockHeader::block_layout(100, 8).expect("layout");
        assert_eq!(layout.size(), 116);
        assert_eq!(layout.align(), 16);

        let wide = BlockHeader::block_layout(100, 128).expect("layout");
        assert_eq!(wide.size(), 228);
        assert_eq!(wide.align(), 128);
    }

    #[test]
    fn header_round_trips_through_buffer() {
        #[repr(C, align(16))]
        struct Buf([u8; 64]);

        let mut buf = Buf([0; 64]);
        let payload = NonNull::new(unsafe { buf.0.as_mut_ptr().add(16) }).unwrap();

        unsafe {
            BlockHeader::write(payload, BlockHeader::new(48, 16));
            let header = BlockHeader::read(payload);
            assert_eq!(header, BlockHeader::new(48, 16));
            assert_eq!(header.base_of(payload), buf.0.as_mut_ptr());
        }
    }
}
