//! OS memory - virtual address space reservation for regions
//!
//! Unix: anonymous private `mmap` with `MAP_NORESERVE`, so untouched pages
//! cost nothing. Windows: `VirtualAlloc` reserve + commit.

use core::ptr::NonNull;

/// Reserve `size` bytes of readable, writable address space
#[cfg(unix)]
pub fn reserve(size: usize) -> Option<NonNull<u8>> {
    if size == 0 {
        return None;
    }

    let ptr = unsafe {
        libc::mmap(
            core::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
            -1,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        None
    } else {
        NonNull::new(ptr.cast::<u8>())
    }
}

/// Return a reservation made by `reserve`
///
/// # Safety
/// `ptr`/`size` must describe exactly one live reservation.
#[cfg(unix)]
pub unsafe fn release(ptr: NonNull<u8>, size: usize) {
    libc::munmap(ptr.as_ptr().cast(), size);
}

#[cfg(windows)]
pub fn reserve(size: usize) -> Option<NonNull<u8>> {
    use winapi::um::memoryapi::VirtualAlloc;
    use winapi::um::winnt::{MEM_COMMIT, MEM_RESERVE, PAGE_READWRITE};

    if size == 0 {
        return None;
    }

    let ptr = unsafe {
        VirtualAlloc(
            core::ptr::null_mut(),
            size,
            MEM_RESERVE | MEM_COMMIT,
            PAGE_READWRITE,
        )
    };

    NonNull::new(ptr.cast::<u8>())
}

/// # Safety
/// `ptr` must be the base of one live reservation.
#[cfg(windows)]
pub unsafe fn release(ptr: NonNull<u8>, _size: usize) {
    use winapi::um::memoryapi::VirtualFree;
    use winapi::um::winnt::MEM_RELEASE;

    VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_and_release() {
        let size = 1 << 20;
        let ptr = reserve(size).expect("reservation");

        unsafe {
            // First and last byte are both writable
            ptr.as_ptr().write(0xAB);
            ptr.as_ptr().add(size - 1).write(0xCD);
            assert_eq!(ptr.as_ptr().read(), 0xAB);
            release(ptr, size);
        }
    }

    #[test]
    fn zero_sized_reservation_refused() {
        assert!(reserve(0).is_none());
    }
}
