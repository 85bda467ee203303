//! Logging infrastructure - structured tracing for allocators and containers
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels via environment
//! - Zero-cost when disabled
//! - Optional non-blocking file output
//! - Span-based performance tracking

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

// Re-export tracing macros for use throughout the crate
pub use tracing::{debug, error, info, trace, warn};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Keeps the file writer thread alive for the life of the process
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Enable file logging
    pub file_output: bool,
    /// Log file path (if file_output enabled)
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: false,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // ZATAR_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("ZATAR_LOG_LEVEL") {
            config.level = parse_level(&level_str).unwrap_or(Level::INFO);
        }

        // ZATAR_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("ZATAR_LOG_FILE") {
            config.file_output = true;
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("ZATAR_LOG_JSON").is_ok();
        config.show_spans = std::env::var("ZATAR_LOG_SPANS").is_ok();

        config
    }

    /// Minimal logging for hot allocation paths
    pub fn performance() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Verbose logging, every allocation traced to `zatar.log`
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            file_output: true,
            log_path: Some("zatar.log".to_string()),
            json_format: false,
            show_spans: true,
        }
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
///
/// Only the first call has any effect. If another global subscriber is
/// already installed (e.g. by a test harness) it is left in place.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("zatar={}", config.level.as_str().to_lowercase()))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        if config.json_format {
            layers.push(
                fmt::layer()
                    .json()
                    .with_writer(io::stdout)
                    .with_span_events(span_events.clone())
                    .boxed(),
            );
        } else {
            layers.push(
                fmt::layer()
                    .with_writer(io::stdout)
                    .with_span_events(span_events.clone())
                    .with_target(true)
                    .with_line_number(cfg!(debug_assertions))
                    .boxed(),
            );
        }

        if let (true, Some(path)) = (config.file_output, config.log_path.as_deref()) {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file = path.file_name().map(|f| f.to_os_string()).unwrap_or_else(|| "zatar.log".into());

            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
            let _ = FILE_GUARD.set(guard);

            layers.push(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_span_events(span_events)
                    .boxed(),
            );
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .ok();
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Allocator and container events
// ============================================================================

/// Log memory allocation
#[inline]
pub fn log_allocation(size: usize, ptr: *const u8) {
    trace!(
        event = "allocation",
        size_bytes = size,
        address = ?ptr,
        "Memory allocated"
    );
}

/// Log memory deallocation
#[inline]
pub fn log_deallocation(ptr: *const u8) {
    trace!(
        event = "deallocation",
        address = ?ptr,
        "Memory deallocated"
    );
}

/// Log an allocation request that could not be satisfied
pub fn log_allocation_failure(error: &crate::AllocError) {
    warn!(
        event = "allocation_failed",
        error = %error,
        "Allocation failed"
    );
}

pub fn log_region_reset(bytes_released: usize) {
    debug!(
        event = "region_reset",
        bytes_released,
        "Region cursor rewound"
    );
}

pub fn log_region_destroy(capacity: usize) {
    debug!(
        event = "region_destroy",
        capacity,
        "Region reservation released"
    );
}

/// Log bulk release of a tracked heap
pub fn log_heap_release(released: usize, destroyed: bool) {
    debug!(
        event = if destroyed { "heap_destroy" } else { "heap_reset" },
        pointers_released = released,
        "Tracked heap released"
    );
}

pub fn log_pointer_table_grow(old_capacity: usize, new_capacity: usize) {
    debug!(
        event = "pointer_table_grow",
        old_capacity,
        new_capacity,
        "Pointer table resized"
    );
}

pub fn log_hash_table_resize(old_capacity: usize, new_capacity: usize, live: usize) {
    debug!(
        event = "hash_table_resize",
        old_capacity,
        new_capacity,
        live_entries = live,
        "Hash table resized"
    );
}

/// Performance tracking utilities
pub mod perf {
    use std::time::Instant;
    use tracing::debug;

    /// Track operation duration (returns guard that logs on drop)
    #[must_use]
    pub fn track(operation: &str) -> PerformanceGuard {
        PerformanceGuard {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub struct PerformanceGuard {
        operation: String,
        start: Instant,
    }

    impl Drop for PerformanceGuard {
        fn drop(&mut self) {
            let elapsed = self.start.elapsed();
            debug!(
                operation = %self.operation,
                duration_us = elapsed.as_micros() as u64,
                "operation completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.file_output);

        let perf_config = LogConfig::performance();
        assert_eq!(perf_config.level, Level::ERROR);

        let debug_config = LogConfig::debug();
        assert_eq!(debug_config.level, Level::TRACE);
        assert_eq!(debug_config.log_path.as_deref(), Some("zatar.log"));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), Some(Level::TRACE));
        assert_eq!(parse_level("warn"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_init_idempotent() {
        init_with_config(LogConfig::performance());
        init_with_config(LogConfig::performance()); // Should not panic
        assert!(is_initialized());
    }
}
