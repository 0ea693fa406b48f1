//! Observability metrics for the rate gate.
//!
//! Counters are updated by the gate while it makes admission decisions and
//! can be read at any time without taking the gate's lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking admission statistics.
///
/// Cloning is cheap and every clone observes the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Slots reserved
    admissions: AtomicU64,
    /// Blocking calls that had to wait at least once
    waits: AtomicU64,
    /// Timed calls that gave up
    timeouts: AtomicU64,
    /// Non-blocking calls refused at capacity
    rejections: AtomicU64,
    /// Times capacity was released by the window moving on
    rollovers: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                admissions: AtomicU64::new(0),
                waits: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
                rejections: AtomicU64::new(0),
                rollovers: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_admission(&self) {
        self.inner.admissions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wait(&self) {
        self.inner.waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.inner.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejection(&self) {
        self.inner.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollover(&self) {
        self.inner.rollovers.fetch_add(1, Ordering::Relaxed);
    }

    /// Total slots reserved.
    pub fn admissions(&self) -> u64 {
        self.inner.admissions.load(Ordering::Relaxed)
    }

    /// Blocking calls that found the gate at capacity.
    pub fn waits(&self) -> u64 {
        self.inner.waits.load(Ordering::Relaxed)
    }

    /// Timed calls that returned without a slot.
    pub fn timeouts(&self) -> u64 {
        self.inner.timeouts.load(Ordering::Relaxed)
    }

    /// Non-blocking calls refused at capacity.
    pub fn rejections(&self) -> u64 {
        self.inner.rejections.load(Ordering::Relaxed)
    }

    /// Window rollovers (expiry batches for sliding windows).
    pub fn rollovers(&self) -> u64 {
        self.inner.rollovers.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admissions: self.admissions(),
            waits: self.waits(),
            timeouts: self.timeouts(),
            rejections: self.rejections(),
            rollovers: self.rollovers(),
        }
    }

    /// Reset all metrics to zero.
    ///
    /// Only the counters are reset; the gate's window is untouched.
    pub fn reset(&self) {
        self.inner.admissions.store(0, Ordering::Relaxed);
        self.inner.waits.store(0, Ordering::Relaxed);
        self.inner.timeouts.store(0, Ordering::Relaxed);
        self.inner.rejections.store(0, Ordering::Relaxed);
        self.inner.rollovers.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub admissions: u64,
    pub waits: u64,
    pub timeouts: u64,
    pub rejections: u64,
    pub rollovers: u64,
}

impl MetricsSnapshot {
    /// Fraction of admissions that had to wait (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been admitted yet.
    pub fn wait_rate(&self) -> f64 {
        if self.admissions == 0 {
            0.0
        } else {
            (self.waits as f64 / self.admissions as f64).min(1.0)
        }
    }

    /// Calls that left the gate without a slot.
    pub fn refused(&self) -> u64 {
        self.timeouts.saturating_add(self.rejections)
    }
}
