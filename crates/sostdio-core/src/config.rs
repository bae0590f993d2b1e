//! Stream configuration.
//!
//! The default buffer capacity comes from the `SOSTDIO_BUFSIZ` environment
//! variable, read once and cached. Unset, unparsable, or out-of-range values
//! fall back to [`BUFSIZ`].

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::stdio::buffer::BUFSIZ;

/// Environment variable holding the default buffer capacity.
pub const BUFSIZ_ENV: &str = "SOSTDIO_BUFSIZ";

/// Largest accepted buffer capacity (1 MiB).
pub const MAX_BUFFER_CAPACITY: usize = 1 << 20;

// 0 = unresolved; any resolved capacity is at least 1.
static CACHED_CAPACITY: AtomicUsize = AtomicUsize::new(0);

/// Parse a capacity value, falling back to [`BUFSIZ`].
#[must_use]
pub fn parse_buffer_capacity(raw: &str) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=MAX_BUFFER_CAPACITY).contains(&n) => n,
        _ => BUFSIZ,
    }
}

/// Configured default buffer capacity (reads env var on first call).
#[must_use]
pub fn buffer_capacity() -> usize {
    let cached = CACHED_CAPACITY.load(Ordering::Relaxed);
    if cached != 0 {
        return cached;
    }
    let capacity = std::env::var(BUFSIZ_ENV)
        .map(|v| parse_buffer_capacity(&v))
        .unwrap_or(BUFSIZ);
    CACHED_CAPACITY.store(capacity, Ordering::Relaxed);
    capacity
}

/// Per-stream settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Size of the single read/write block.
    pub buffer_capacity: usize,
}

impl StreamConfig {
    /// Settings resolved from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            buffer_capacity: buffer_capacity(),
        }
    }

    /// Settings with an explicit capacity.
    #[must_use]
    pub const fn with_capacity(buffer_capacity: usize) -> Self {
        Self { buffer_capacity }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::with_capacity(BUFSIZ)
    }
}
