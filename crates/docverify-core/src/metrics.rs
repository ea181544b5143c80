//! Global atomic counters for DocVerify observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. on daemon shutdown or at the end of a CLI
//! command).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    records_imported: AtomicU64,
    edits_applied: AtomicU64,
    status_transitions: AtomicU64,
    persist_retries: AtomicU64,
    persist_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            records_imported: AtomicU64::new(0),
            edits_applied: AtomicU64::new(0),
            status_transitions: AtomicU64::new(0),
            persist_retries: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
        }
    }

    /// Increment the records-imported counter by one.
    pub fn inc_records_imported(&self) {
        self.records_imported.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "records_imported", "counter incremented");
    }

    /// Increment the edits-applied counter by one.
    pub fn inc_edits_applied(&self) {
        self.edits_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "edits_applied", "counter incremented");
    }

    /// Increment the status-transitions counter by one.
    pub fn inc_status_transitions(&self) {
        self.status_transitions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "status_transitions", "counter incremented");
    }

    /// Increment the persist-retries counter by one.
    pub fn inc_persist_retries(&self) {
        self.persist_retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "persist_retries", "counter incremented");
    }

    /// Increment the persist-failures counter by one.
    pub fn inc_persist_failures(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "persist_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            records_imported = self.records_imported(),
            edits_applied = self.edits_applied(),
            status_transitions = self.status_transitions(),
            persist_retries = self.persist_retries(),
            persist_failures = self.persist_failures(),
        );
    }

    pub fn records_imported(&self) -> u64 {
        self.records_imported.load(Ordering::Relaxed)
    }

    pub fn edits_applied(&self) -> u64 {
        self.edits_applied.load(Ordering::Relaxed)
    }

    pub fn status_transitions(&self) -> u64 {
        self.status_transitions.load(Ordering::Relaxed)
    }

    pub fn persist_retries(&self) -> u64 {
        self.persist_retries.load(Ordering::Relaxed)
    }

    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.records_imported.store(0, Ordering::Relaxed);
        self.edits_applied.store(0, Ordering::Relaxed);
        self.status_transitions.store(0, Ordering::Relaxed);
        self.persist_retries.store(0, Ordering::Relaxed);
        self.persist_failures.store(0, Ordering::Relaxed);
    }
}
