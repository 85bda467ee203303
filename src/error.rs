//! Allocation errors shared by every allocator and container
//!
//! Not-found is never an error: lookups return `None` or a caller-supplied
//! fallback. Only capacity and memory conditions surface here.

/// Failure reported synchronously by the call that triggered it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Region ran past its reserved limit
    Exhausted { requested: usize, remaining: usize },
    /// General-purpose allocator returned null
    OutOfMemory { size: usize },
    /// Alignment not a power of two, or size overflowed
    InvalidLayout { size: usize, align: usize },
    /// OS refused the virtual reservation
    ReserveFailed { capacity: usize },
    /// Pointer was not handed out by this allocator, or was already freed
    UntrackedPointer,
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Exhausted { requested, remaining } => write!(
                f,
                "Region exhausted: requested {} bytes, {} remaining",
                requested, remaining
            ),
            Self::OutOfMemory { size } => write!(f, "Out of memory allocating {} bytes", size),
            Self::InvalidLayout { size, align } => {
                write!(f, "Invalid layout: size {}, align {}", size, align)
            }
            Self::ReserveFailed { capacity } => {
                write!(f, "Failed to reserve {} bytes of address space", capacity)
            }
            Self::UntrackedPointer => write!(f, "Pointer is not owned by this allocator"),
        }
    }
}

impl std::error::Error for AllocError {}
