//! Outcome counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of the three terminal outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Delivered (possibly after retries), or attempted during drain.
    pub processed: u64,
    /// Retry budget exhausted, or retry abandoned by shutdown.
    pub failed: u64,
    /// Rejected at enqueue time because the queue was full.
    pub dropped: u64,
}

impl MetricsSnapshot {
    pub fn total(&self) -> u64 {
        self.processed + self.failed + self.dropped
    }
}

/// Monotonic counters, only ever incremented.
#[derive(Debug, Default)]
pub(crate) struct QueueMetrics {
    processed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl QueueMetrics {
    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
