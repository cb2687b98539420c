//! Metrics for async task processing and database coordination.
//!
//! Instruments are plain atomics, shared through an `Arc<CoordinationMetrics>`
//! by the async processor, the tasks it runs and the connection pool.
//!
//! # Example
//!
//! ```rust,ignore
//! use quorum_cache::metrics::CoordinationMetrics;
//!
//! let metrics = CoordinationMetrics::new();
//! metrics.record_async_outcome("add", true);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.async_tasks_processed, 1);
//! ```

mod instruments;

pub use instruments::{Counter, Gauge, LabeledCounter};

use serde::Serialize;
use tracing::info;

/// Metrics shared by the async processor and the connection pool.
#[derive(Debug)]
pub struct CoordinationMetrics {
    // Async tasks
    /// Tasks accepted by the processor.
    pub async_tasks_enqueued: Counter,
    /// Tasks that ran to completion, successfully or not.
    pub async_tasks_processed: Counter,
    /// Tasks whose engine call failed.
    pub async_tasks_failed: Counter,
    /// Tasks that panicked inside a worker.
    pub async_task_panics: Counter,
    /// Tasks waiting in either queue.
    pub async_queue_depth: Gauge,
    /// Outcomes by operation and result.
    pub async_outcomes: LabeledCounter<2>,

    // Connection pool
    /// Connections currently pooled.
    pub connections_pooled: Gauge,
    /// Connections dropped from the pool.
    pub connections_evicted: Counter,
    /// Sync-table snapshots that failed and were rolled back.
    pub sync_snapshot_failures: Counter,
}

impl CoordinationMetrics {
    pub fn new() -> Self {
        Self {
            async_tasks_enqueued: Counter::new("async_tasks_enqueued_total"),
            async_tasks_processed: Counter::new("async_tasks_processed_total"),
            async_tasks_failed: Counter::new("async_tasks_failed_total"),
            async_task_panics: Counter::new("async_task_panics_total"),
            async_queue_depth: Gauge::new("async_queue_depth"),
            async_outcomes: LabeledCounter::new("async_outcomes_total", ["op", "result"]),
            connections_pooled: Gauge::new("db_connections_pooled"),
            connections_evicted: Counter::new("db_connections_evicted_total"),
            sync_snapshot_failures: Counter::new("db_sync_snapshot_failures_total"),
        }
    }

    /// Record the outcome of one async operation.
    pub fn record_async_outcome(&self, op: &str, success: bool) {
        self.async_tasks_processed.inc();
        if success {
            self.async_outcomes.inc([op, "success"]);
        } else {
            self.async_tasks_failed.inc();
            self.async_outcomes.inc([op, "failed"]);
        }
    }

    /// Point-in-time copy of every instrument.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            async_tasks_enqueued: self.async_tasks_enqueued.get(),
            async_tasks_processed: self.async_tasks_processed.get(),
            async_tasks_failed: self.async_tasks_failed.get(),
            async_task_panics: self.async_task_panics.get(),
            async_queue_depth: self.async_queue_depth.get(),
            connections_pooled: self.connections_pooled.get(),
            connections_evicted: self.connections_evicted.get(),
            sync_snapshot_failures: self.sync_snapshot_failures.get(),
        }
    }

    /// Emit the current values as one structured log line.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            enqueued = s.async_tasks_enqueued,
            processed = s.async_tasks_processed,
            failed = s.async_tasks_failed,
            panics = s.async_task_panics,
            queue_depth = s.async_queue_depth,
            pooled = s.connections_pooled,
            evicted = s.connections_evicted,
            sync_failures = s.sync_snapshot_failures,
            "Coordination metrics"
        );
    }
}

impl Default for CoordinationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of [`CoordinationMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub async_tasks_enqueued: u64,
    pub async_tasks_processed: u64,
    pub async_tasks_failed: u64,
    pub async_task_panics: u64,
    pub async_queue_depth: i64,
    pub connections_pooled: i64,
    pub connections_evicted: u64,
    pub sync_snapshot_failures: u64,
}

impl MetricsSnapshot {
    /// Share of processed tasks that failed.
    pub fn failure_rate(&self) -> f64 {
        if self.async_tasks_processed == 0 {
            0.0
        } else {
            self.async_tasks_failed as f64 / self.async_tasks_processed as f64
        }
    }
}
