//! Metrics for the batch scheduler.

use std::sync::atomic::{AtomicU64, Ordering};

use super::task::CommitOutcome;
use super::window::FlushReason;

/// Counters describing scheduler activity
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Total queries admitted through `schedule`
    pub queries_scheduled: AtomicU64,

    /// Queries currently waiting in the task queue
    pub queries_queued: AtomicU64,

    /// Tasks flushed but not yet committed
    pub tasks_pending: AtomicU64,

    /// Commits that reached their caller
    pub tasks_resolved: AtomicU64,

    /// Commits for tokens that were unknown or already committed
    pub unknown_commits: AtomicU64,

    /// Commits whose caller had dropped its handle
    pub callers_gone: AtomicU64,

    /// Batches flushed because the queue reached `batch_max_size`
    pub size_flushes: AtomicU64,

    /// Batches flushed because the window went stale
    pub staleness_flushes: AtomicU64,

    /// Batches flushed by the debounce timer
    pub timer_flushes: AtomicU64,

    /// Batches flushed explicitly
    pub manual_flushes: AtomicU64,

    /// Total tasks across all batches (for batch size averaging)
    pub total_batch_tasks: AtomicU64,

    /// Largest batch observed
    pub max_batch_size: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a query entering the task queue
    pub fn record_scheduled(&self) {
        self.queries_scheduled.fetch_add(1, Ordering::Relaxed);
        self.queries_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch moving from the queue into the pending registry
    pub fn record_flush(&self, reason: FlushReason, batch_size: usize) {
        let size = batch_size as u64;
        let counter = match reason {
            FlushReason::Size => &self.size_flushes,
            FlushReason::Staleness => &self.staleness_flushes,
            FlushReason::Timer => &self.timer_flushes,
            FlushReason::Manual => &self.manual_flushes,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.queries_queued.fetch_sub(size, Ordering::Relaxed);
        self.tasks_pending.fetch_add(size, Ordering::Relaxed);
        self.total_batch_tasks.fetch_add(size, Ordering::Relaxed);
        self.max_batch_size.fetch_max(size, Ordering::Relaxed);
    }

    /// Record the outcome of one commit
    pub fn record_commit(&self, outcome: CommitOutcome) {
        match outcome {
            CommitOutcome::Resolved => {
                self.tasks_pending.fetch_sub(1, Ordering::Relaxed);
                self.tasks_resolved.fetch_add(1, Ordering::Relaxed);
            }
            CommitOutcome::CallerGone => {
                self.tasks_pending.fetch_sub(1, Ordering::Relaxed);
                self.callers_gone.fetch_add(1, Ordering::Relaxed);
            }
            CommitOutcome::Unknown => {
                self.unknown_commits.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Total number of batches flushed for any reason
    pub fn batches_flushed(&self) -> u64 {
        self.size_flushes.load(Ordering::Relaxed)
            + self.staleness_flushes.load(Ordering::Relaxed)
            + self.timer_flushes.load(Ordering::Relaxed)
            + self.manual_flushes.load(Ordering::Relaxed)
    }

    /// Calculate average batch size
    pub fn avg_batch_size(&self) -> f64 {
        let batches = self.batches_flushed();
        if batches == 0 {
            return 0.0;
        }
        self.total_batch_tasks.load(Ordering::Relaxed) as f64 / batches as f64
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_scheduled: self.queries_scheduled.load(Ordering::Relaxed),
            queries_queued: self.queries_queued.load(Ordering::Relaxed),
            tasks_pending: self.tasks_pending.load(Ordering::Relaxed),
            tasks_resolved: self.tasks_resolved.load(Ordering::Relaxed),
            unknown_commits: self.unknown_commits.load(Ordering::Relaxed),
            callers_gone: self.callers_gone.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed(),
            size_flushes: self.size_flushes.load(Ordering::Relaxed),
            staleness_flushes: self.staleness_flushes.load(Ordering::Relaxed),
            timer_flushes: self.timer_flushes.load(Ordering::Relaxed),
            manual_flushes: self.manual_flushes.load(Ordering::Relaxed),
            max_batch_size: self.max_batch_size.load(Ordering::Relaxed),
            avg_batch_size: self.avg_batch_size(),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub queries_scheduled: u64,
    pub queries_queued: u64,
    pub tasks_pending: u64,
    pub tasks_resolved: u64,
    pub unknown_commits: u64,
    pub callers_gone: u64,
    pub batches_flushed: u64,
    pub size_flushes: u64,
    pub staleness_flushes: u64,
    pub timer_flushes: u64,
    pub manual_flushes: u64,
    pub max_batch_size: u64,
    pub avg_batch_size: f64,
}
