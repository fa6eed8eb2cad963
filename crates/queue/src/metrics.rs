use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters updated by producers, workers and retry timers.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    pub enqueued: AtomicU64,
    pub rejected: AtomicU64,
    pub processed: AtomicU64,
    pub failed_attempts: AtomicU64,
    pub retried: AtomicU64,
    /// Tasks given up on: retries exhausted or re-enqueue refused.
    pub dropped: AtomicU64,
    /// Pending retries aborted by `stop()`.
    pub retries_cancelled: AtomicU64,
    /// Buffered tasks never dequeued before shutdown.
    pub abandoned: AtomicU64,
}

/// Point-in-time copy of [`QueueMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueMetricsSnapshot {
    pub enqueued: u64,
    pub rejected: u64,
    pub processed: u64,
    pub failed_attempts: u64,
    pub retried: u64,
    pub dropped: u64,
    pub retries_cancelled: u64,
    pub abandoned: u64,
}

impl QueueMetrics {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        QueueMetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            retries_cancelled: self.retries_cancelled.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}
