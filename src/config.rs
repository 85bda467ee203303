//! Allocator configuration
//!
//! Mirrors `LogConfig`: plain defaults, overridable from the environment.
//! - `ZATAR_ALLOCATOR_MODE`: `heap` (default), `region` or `arena`
//! - `ZATAR_REGION_CAPACITY`: bytes, with optional `K`/`M`/`G` suffix

use crate::allocator::AllocatorMode;
use crate::logging::warn;

/// Default virtual reservation for region allocators (256 MiB)
pub const DEFAULT_REGION_CAPACITY: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    pub mode: AllocatorMode,
    /// Address space reserved up front in region mode; ignored for the heap
    pub region_capacity: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            mode: AllocatorMode::Heap,
            region_capacity: DEFAULT_REGION_CAPACITY,
        }
    }
}

impl AllocatorConfig {
    pub fn heap() -> Self {
        Self::default()
    }

    pub fn region(capacity: usize) -> Self {
        Self {
            mode: AllocatorMode::Region,
            region_capacity: capacity,
        }
    }

    /// Create config from environment variables
    ///
    /// Unparseable values are reported and replaced by defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(mode) = std::env::var("ZATAR_ALLOCATOR_MODE") {
            match parse_mode(&mode) {
                Some(mode) => config.mode = mode,
                None => warn!(value = %mode, "Unknown ZATAR_ALLOCATOR_MODE, using heap"),
            }
        }

        if let Ok(capacity) = std::env::var("ZATAR_REGION_CAPACITY") {
            match parse_capacity(&capacity) {
                Some(bytes) => config.region_capacity = bytes,
                None => warn!(
                    value = %capacity,
                    default = DEFAULT_REGION_CAPACITY,
                    "Invalid ZATAR_REGION_CAPACITY, using default"
                ),
            }
        }

        config
    }
}

fn parse_mode(s: &str) -> Option<AllocatorMode> {
    match s.trim().to_lowercase().as_str() {
        "heap" | "tracked" => Some(AllocatorMode::Heap),
        "region" | "arena" => Some(AllocatorMode::Region),
        _ => None,
    }
}

/// Parse `4096`, `64K`, `16m`, `1G`; zero is rejected
fn parse_capacity(s: &str) -> Option<usize> {
    let s = s.trim();
    let (digits, shift) = match s.chars().last()? {
        'k' | 'K' => (&s[..s.len() - 1], 10),
        'm' | 'M' => (&s[..s.len() - 1], 20),
        'g' | 'G' => (&s[..s.len() - 1], 30),
        _ => (s, 0),
    };

    let value: usize = digits.trim().parse().ok()?;
    let bytes = value.checked_mul(1usize << shift)?;
    (bytes > 0).then_some(bytes)
}
