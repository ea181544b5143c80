//! Structured observability hooks for the review lifecycle.
//!
//! This module provides:
//! - Record-scoped tracing spans via `RecordSpan` RAII guard
//! - Emission functions for key lifecycle events: import, field edit,
//!   status transition, persist retry and persist failure

use tracing::{info, warn};

use crate::domain::ExtractionStatus;

/// Span tagged with the extraction id.
///
/// Async code attaches it with `tracing::Instrument`; [`RecordSpan`] is the
/// synchronous guard form.
pub fn record_span(extraction_id: &str) -> tracing::Span {
    tracing::info_span!("docverify.record", extraction_id = %extraction_id)
}

/// RAII guard that enters a record-scoped tracing span.
///
/// The guard is `!Send`; do not hold it across an `.await` in a task that
/// must be `Send`.
///
/// # Example
///
/// ```ignore
/// let _span = RecordSpan::enter("ex-12345");
/// // every tracing call below carries extraction_id = "ex-12345"
/// ```
pub struct RecordSpan {
    _span: tracing::span::EnteredSpan,
}

impl RecordSpan {
    /// Create and enter a span tagged with the extraction id.
    pub fn enter(extraction_id: &str) -> Self {
        Self {
            _span: record_span(extraction_id).entered(),
        }
    }
}

/// Emit event: a record was handed off by the extraction engine.
pub fn emit_record_imported(extraction_id: &str, field_count: usize, confidence: f64) {
    info!(
        event = "record.imported",
        extraction_id = %extraction_id,
        field_count = field_count,
        confidence = confidence,
    );
}

/// Emit event: a field patch was committed.
pub fn emit_field_edited(extraction_id: &str, field_id: &str, verified: bool, version: u64) {
    info!(
        event = "field.edited",
        extraction_id = %extraction_id,
        field_id = %field_id,
        verified = verified,
        version = version,
    );
}

/// Emit event: record status changed.
pub fn emit_status_changed(extraction_id: &str, from: ExtractionStatus, to: ExtractionStatus) {
    info!(
        event = "record.status_changed",
        extraction_id = %extraction_id,
        from = %from,
        to = %to,
    );
}

/// Emit event: a durable write failed and will be retried (warning level).
pub fn emit_persist_retry(extraction_id: &str, attempt: u32, error: &dyn std::fmt::Display) {
    warn!(
        event = "persist.retry",
        extraction_id = %extraction_id,
        attempt = attempt,
        error = %error,
    );
}

/// Emit event: a durable write was given up on (warning level).
pub fn emit_persist_failed(extraction_id: &str, attempts: u32, error: &dyn std::fmt::Display) {
    warn!(
        event = "persist.failed",
        extraction_id = %extraction_id,
        attempts = attempts,
        error = %error,
    );
}

/// Emit event: an audit entry could not be written (warning level).
pub fn emit_audit_write_failed(extraction_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "audit.write_failed", extraction_id = %extraction_id, error = %error);
}
