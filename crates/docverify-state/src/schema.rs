//! Schema definitions for DocVerify SurrealDB tables
//!
//! Tables:
//! - extractions: One row per extraction record (versioned)
//! - review_events: Append-only audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::{StoredExtraction, StoredReviewEvent};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Row in the `extractions` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRow {
    /// SurrealDB record ID (never written back)
    #[serde(default, skip_serializing)]
    pub id: Option<surrealdb::sql::Thing>,
    pub extraction_id: String,
    pub document_title: String,
    pub status: String,
    #[serde(with = "surreal_datetime")]
    pub extracted_at: DateTime<Utc>,
    pub version: u64,
    pub payload: serde_json::Value,
}

impl From<StoredExtraction> for ExtractionRow {
    fn from(row: StoredExtraction) -> Self {
        ExtractionRow {
            id: None,
            extraction_id: row.extraction_id,
            document_title: row.document_title,
            status: row.status,
            extracted_at: row.extracted_at,
            version: row.version,
            payload: row.payload,
        }
    }
}

impl From<ExtractionRow> for StoredExtraction {
    fn from(row: ExtractionRow) -> Self {
        StoredExtraction {
            extraction_id: row.extraction_id,
            document_title: row.document_title,
            status: row.status,
            extracted_at: row.extracted_at,
            version: row.version,
            payload: row.payload,
        }
    }
}

/// Row in the `review_events` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEventRow {
    #[serde(default, skip_serializing)]
    pub id: Option<surrealdb::sql::Thing>,
    pub event_id: String,
    pub extraction_id: String,
    pub kind: String,
    pub actor: String,
    pub payload: serde_json::Value,
    #[serde(with = "surreal_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl From<StoredReviewEvent> for ReviewEventRow {
    fn from(event: StoredReviewEvent) -> Self {
        ReviewEventRow {
            id: None,
            event_id: event.event_id,
            extraction_id: event.extraction_id,
            kind: event.kind,
            actor: event.actor,
            payload: event.payload,
            timestamp: event.timestamp,
        }
    }
}

impl From<ReviewEventRow> for StoredReviewEvent {
    fn from(row: ReviewEventRow) -> Self {
        StoredReviewEvent {
            event_id: row.event_id,
            extraction_id: row.extraction_id,
            kind: row.kind,
            actor: row.actor,
            payload: row.payload,
            timestamp: row.timestamp,
        }
    }
}
