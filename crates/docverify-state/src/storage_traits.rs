//! Storage trait definitions for DocVerify
//!
//! `ExtractionStore` is the durable side of the extraction repository:
//! - stored extractions (one row per record, versioned)
//! - review events (append-only audit trail per record)
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Stored extractions
// ---------------------------------------------------------------------------

/// Durable form of one extraction record.
///
/// The indexed columns (`document_title`, `status`, `extracted_at`) are
/// copied out of `payload` so backends can index them; `payload` carries the
/// full record as produced by the domain layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredExtraction {
    pub extraction_id: String,
    pub document_title: String,
    pub status: String,
    pub extracted_at: DateTime<Utc>,
    /// Monotonic revision of the record.
    pub version: u64,
    pub payload: serde_json::Value,
}

/// What a `put` did with the incoming row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The row was written.
    Written,
    /// A newer version is already stored; the write was dropped.
    Stale { stored_version: u64 },
}

// ---------------------------------------------------------------------------
// Review events
// ---------------------------------------------------------------------------

/// A single review event in a record's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReviewEvent {
    /// Unique event id
    pub event_id: String,
    pub extraction_id: String,
    /// Event kind (e.g. "field_edited", "marked_failed", "reopened")
    pub kind: String,
    /// Operator who triggered the event
    pub actor: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Durable extraction store.
///
/// Guarantees:
/// - `insert` never overwrites; duplicates fail with `AlreadyExists`.
/// - `put` only replaces an existing row and never regresses: a row whose
///   `version` is lower than the stored one is dropped (`PutOutcome::Stale`).
///   Writing the same version again is accepted, so retries are idempotent.
/// - `history` returns events oldest first.
#[async_trait]
pub trait ExtractionStore: Send + Sync {
    /// Store a newly handed-off extraction.
    async fn insert(&self, row: StoredExtraction) -> StorageResult<()>;

    /// Replace a stored extraction. Returns `StorageError::NotFound` if absent.
    async fn put(&self, row: StoredExtraction) -> StorageResult<PutOutcome>;

    /// Retrieve a stored extraction by id.
    async fn get(&self, extraction_id: &str) -> StorageResult<StoredExtraction>;

    /// Load every stored extraction, newest extraction first.
    async fn load_all(&self) -> StorageResult<Vec<StoredExtraction>>;

    /// Append an event to a record's audit trail.
    async fn append_event(&self, event: StoredReviewEvent) -> StorageResult<()>;

    /// All events for a record, oldest first.
    async fn history(&self, extraction_id: &str) -> StorageResult<Vec<StoredReviewEvent>>;
}
