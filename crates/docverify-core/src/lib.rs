//! DocVerify Core Library
//!
//! Extraction review and verification: operators correct and confirm the
//! field values an extraction engine produced, and each record's status is
//! derived from its fields.
//!
//! ## Layer 1 - Domain / Orchestration
//!
//! - `FieldStore`: validated point updates of one field
//! - `ExtractionRecord`: aggregate of fields, owns the status rule
//! - `ExtractionRepository`: per-record locking, copy-on-write snapshots,
//!   write-through to a `docverify_state::ExtractionStore`
//! - `VerificationService`: the entry point used by `docverifyd` and the CLI

pub mod audit;
pub mod config;
pub mod domain;
pub mod export;
pub mod field_store;
pub mod metrics;
pub mod obs;
pub mod repository;
pub mod service;
pub mod stats;
pub mod telemetry;

pub use audit::{ReviewAction, ReviewEvent};
pub use config::{ConfigError, ReviewConfig};
pub use domain::{
    ConfidenceBand, ExtractionFilter, ExtractionId, ExtractionRecord, ExtractionStatus, Field,
    FieldId, FieldKind, FieldPatch, NewExtraction, NewField, Result, ValidationError, VerifyError,
};
pub use export::{ExportFormat, ExportRow, ExportSnapshot};
pub use field_store::FieldStore;
pub use metrics::METRICS;
pub use obs::{
    emit_audit_write_failed, emit_field_edited, emit_persist_failed, emit_persist_retry,
    emit_record_imported, emit_status_changed, record_span, RecordSpan,
};
pub use repository::{ExtractionRepository, RecordLock};
pub use service::{RetryPolicy, VerificationService};
pub use stats::ReviewStats;
pub use telemetry::init_tracing;

pub use docverify_state::{DbConfig, SurrealHandle};
