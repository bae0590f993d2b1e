//! Atomic counters for stream observability.
//!
//! One process-wide set, bumped by the stream engine and the pipe adapter.
//! Relaxed ordering throughout; a snapshot taken while streams are busy is
//! only approximately consistent across counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global stream operation counters.
pub struct StdioMetrics {
    /// Bulk reads issued against a device.
    pub os_reads: AtomicU64,
    /// Write calls issued while draining a buffer.
    pub os_writes: AtomicU64,
    /// Writes that accepted fewer bytes than offered.
    pub short_writes: AtomicU64,
    /// Flush attempts.
    pub flushes: AtomicU64,
    /// Seek requests.
    pub seeks: AtomicU64,
    /// OS-level failures recorded on any stream.
    pub errors: AtomicU64,
    /// Child processes started by the pipe adapter.
    pub spawns: AtomicU64,
    /// Child processes reaped.
    pub reaps: AtomicU64,
}

impl StdioMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            os_reads: AtomicU64::new(0),
            os_writes: AtomicU64::new(0),
            short_writes: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            seeks: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            spawns: AtomicU64::new(0),
            reaps: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            os_reads: Self::get(&self.os_reads),
            os_writes: Self::get(&self.os_writes),
            short_writes: Self::get(&self.short_writes),
            flushes: Self::get(&self.flushes),
            seeks: Self::get(&self.seeks),
            errors: Self::get(&self.errors),
            spawns: Self::get(&self.spawns),
            reaps: Self::get(&self.reaps),
        }
    }
}

impl Default for StdioMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all stream counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub os_reads: u64,
    pub os_writes: u64,
    pub short_writes: u64,
    pub flushes: u64,
    pub seeks: u64,
    pub errors: u64,
    pub spawns: u64,
    pub reaps: u64,
}

/// Global metrics instance.
static GLOBAL_METRICS: StdioMetrics = StdioMetrics::new();

/// Access the global metrics.
#[must_use]
pub fn global_metrics() -> &'static StdioMetrics {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = StdioMetrics::new();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn inc_and_snapshot() {
        let m = StdioMetrics::new();
        StdioMetrics::inc(&m.os_reads);
        StdioMetrics::inc(&m.os_reads);
        StdioMetrics::inc(&m.spawns);
        let s = m.snapshot();
        assert_eq!(s.os_reads, 2);
        assert_eq!(s.spawns, 1);
        assert_eq!(s.reaps, 0);
    }
}
