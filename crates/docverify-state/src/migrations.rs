//! SurrealDB schema migrations and initialization
//!
//! Sets up the `extractions` and `review_events` tables with their
//! uniqueness constraints and lookup indexes.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Unique index on `extractions.extraction_id`.
pub const UNIQUE_EXTRACTION_INDEX: &str = "idx_extraction_id";

/// Initialize all DocVerify tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing DocVerify SurrealDB schema");

    init_extractions_table(db).await?;
    init_review_events_table(db).await?;

    info!("DocVerify schema initialization complete");
    Ok(())
}

/// Initialize `extractions` table
///
/// Schema:
/// ```text
/// TABLE extractions {
///   extraction_id:   STRING (unique)
///   document_title:  STRING (indexed)
///   status:          STRING (pending_verification | verified | verification_failed)
///   extracted_at:    DATETIME (indexed)
///   version:         INT
///   payload:         OBJECT (full record)
/// }
/// ```
///
/// Rows are never deleted by this service; archival happens elsewhere.
async fn init_extractions_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing extractions table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS extractions SCHEMALESS
            PERMISSIONS
                FOR select, create, update FULL,
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_extraction_id ON TABLE extractions COLUMNS extraction_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_document_title ON TABLE extractions COLUMNS document_title;
        DEFINE INDEX IF NOT EXISTS idx_status ON TABLE extractions COLUMNS status;
        DEFINE INDEX IF NOT EXISTS idx_extracted_at ON TABLE extractions COLUMNS extracted_at;
    "#;

    db.query(sql)
        .await?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    debug!("extractions table initialized");
    Ok(())
}

/// Initialize `review_events` table
///
/// Append-only: updates and deletes are denied.
async fn init_review_events_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing review_events table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS review_events SCHEMALESS
            PERMISSIONS
                FOR select, create FULL,
                FOR update, delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_event_id ON TABLE review_events COLUMNS event_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_event_extraction ON TABLE review_events COLUMNS extraction_id, timestamp;
    "#;

    db.query(sql)
        .await?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    debug!("review_events table initialized");
    Ok(())
}
