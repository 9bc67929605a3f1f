//! Logger metrics for observability
//!
//! Counters for the health of the logging pipeline itself: records written,
//! sink failures, elided stack traces and event pool misuse.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// One instance is shared by every logger of a registry.
///
/// # Example
///
/// ```
/// use rust_json_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_written();
/// metrics.record_elided();
///
/// assert_eq!(metrics.records_written(), 1);
/// assert_eq!(metrics.traces_elided(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records handed to a sink without error
    records_written: AtomicU64,

    /// Records whose sink write failed and went to the diagnostic writer
    write_failures: AtomicU64,

    /// Throwables whose stack trace was replaced by the repetition marker
    traces_elided: AtomicU64,

    /// Re-entrant log calls that found the thread's event already borrowed
    pool_misses: AtomicU64,

    /// Pooled events found dirty when borrowed
    pool_violations: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            traces_elided: AtomicU64::new(0),
            pool_misses: AtomicU64::new(0),
            pool_violations: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn traces_elided(&self) -> u64 {
        self.traces_elided.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pool_misses(&self) -> u64 {
        self.pool_misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pool_violations(&self) -> u64 {
        self.pool_violations.load(Ordering::Relaxed)
    }

    /// Record a successfully written record, returning the previous count
    #[inline]
    pub fn record_written(&self) -> u64 {
        self.records_written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_failure(&self) -> u64 {
        self.write_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_elided(&self) -> u64 {
        self.traces_elided.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_pool_miss(&self) -> u64 {
        self.pool_misses.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_pool_violation(&self) -> u64 {
        self.pool_violations.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed writes as a percentage of all attempted writes (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been written.
    pub fn failure_rate(&self) -> f64 {
        let failed = self.write_failures() as f64;
        let total = self.records_written() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.records_written.store(0, Ordering::Relaxed);
        self.write_failures.store(0, Ordering::Relaxed);
        self.traces_elided.store(0, Ordering::Relaxed);
        self.pool_misses.store(0, Ordering::Relaxed);
        self.pool_violations.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            records_written: AtomicU64::new(self.records_written()),
            write_failures: AtomicU64::new(self.write_failures()),
            traces_elided: AtomicU64::new(self.traces_elided()),
            pool_misses: AtomicU64::new(self.pool_misses()),
            pool_violations: AtomicU64::new(self.pool_violations()),
        }
    }
}
