//! SurrealDB-backed ExtractionStore implementation
//!
//! Uses `schema::ExtractionRow` and `schema::ReviewEventRow` for persistence,
//! converting to/from `storage_traits` types at the boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::debug;

use crate::error::StorageError;
use crate::handle::SurrealHandle;
use crate::migrations::UNIQUE_EXTRACTION_INDEX;
use crate::schema::{ExtractionRow, ReviewEventRow};
use crate::storage_traits::{
    ExtractionStore, PutOutcome, StorageResult, StoredExtraction, StoredReviewEvent,
};

/// SurrealDB-backed implementation of [`ExtractionStore`].
pub struct SurrealExtractionStore {
    db: Surreal<Any>,
}

impl SurrealExtractionStore {
    /// Wrap an already connected handle.
    pub fn new(handle: &SurrealHandle) -> Self {
        Self {
            db: handle.db().clone(),
        }
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        let handle = SurrealHandle::in_memory().await?;
        Ok(Self::new(&handle))
    }

    // -- private helpers -----------------------------------------------------

    async fn create_row(&self, row: StoredExtraction) -> StorageResult<()> {
        debug!(extraction_id = %row.extraction_id, "inserting extraction");
        let extraction_id = row.extraction_id.clone();
        let _created: Option<ExtractionRow> = self
            .db
            .create("extractions")
            .content(ExtractionRow::from(row))
            .await
            .map_err(|e| insert_error(e, &extraction_id))?;
        Ok(())
    }

    async fn fetch_row(&self, extraction_id: &str) -> StorageResult<Option<ExtractionRow>> {
        let mut res = self
            .db
            .query("SELECT * FROM extractions WHERE extraction_id = $eid")
            .bind(("eid", extraction_id.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<ExtractionRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }
}

fn backend(err: surrealdb::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

/// A concurrent insert that lost the race trips the unique index.
fn insert_error(err: surrealdb::Error, extraction_id: &str) -> StorageError {
    let message = err.to_string();
    if message.contains(UNIQUE_EXTRACTION_INDEX) && message.contains("already contains") {
        StorageError::AlreadyExists {
            extraction_id: extraction_id.to_string(),
        }
    } else {
        StorageError::Backend(message)
    }
}

#[async_trait]
impl ExtractionStore for SurrealExtractionStore {
    async fn insert(&self, row: StoredExtraction) -> StorageResult<()> {
        if self.fetch_row(&row.extraction_id).await?.is_some() {
            return Err(StorageError::AlreadyExists {
                extraction_id: row.extraction_id,
            });
        }
        self.create_row(row).await
    }

    async fn put(&self, row: StoredExtraction) -> StorageResult<PutOutcome> {
        let extraction_id = row.extraction_id.clone();
        let version = row.version;
        let db_row = ExtractionRow::from(row);

        let mut res = self
            .db
            .query(
                "UPDATE extractions CONTENT $row \
                 WHERE extraction_id = $eid AND version <= $version \
                 RETURN AFTER",
            )
            .bind(("row", db_row))
            .bind(("eid", extraction_id.clone()))
            .bind(("version", version))
            .await
            .map_err(backend)?;

        let written: Vec<ExtractionRow> = res.take(0).map_err(backend)?;
        if !written.is_empty() {
            return Ok(PutOutcome::Written);
        }

        match self.fetch_row(&extraction_id).await? {
            Some(stored) => {
                debug!(extraction_id = %extraction_id, stored = stored.version, incoming = version, "dropping stale write");
                Ok(PutOutcome::Stale {
                    stored_version: stored.version,
                })
            }
            None => Err(StorageError::NotFound { extraction_id }),
        }
    }

    async fn get(&self, extraction_id: &str) -> StorageResult<StoredExtraction> {
        self.fetch_row(extraction_id)
            .await?
            .map(StoredExtraction::from)
            .ok_or_else(|| StorageError::NotFound {
                extraction_id: extraction_id.to_string(),
            })
    }

    async fn load_all(&self) -> StorageResult<Vec<StoredExtraction>> {
        let mut res = self
            .db
            .query("SELECT * FROM extractions ORDER BY extracted_at DESC, extraction_id ASC")
            .await
            .map_err(backend)?;
        let rows: Vec<ExtractionRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().map(StoredExtraction::from).collect())
    }

    async fn append_event(&self, event: StoredReviewEvent) -> StorageResult<()> {
        if self.fetch_row(&event.extraction_id).await?.is_none() {
            return Err(StorageError::NotFound {
                extraction_id: event.extraction_id,
            });
        }

        let _created: Option<ReviewEventRow> = self
            .db
            .create("review_events")
            .content(ReviewEventRow::from(event))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn history(&self, extraction_id: &str) -> StorageResult<Vec<StoredReviewEvent>> {
        if self.fetch_row(extraction_id).await?.is_none() {
            return Err(StorageError::NotFound {
                extraction_id: extraction_id.to_string(),
            });
        }

        let mut res = self
            .db
            .query("SELECT * FROM review_events WHERE extraction_id = $eid ORDER BY timestamp ASC")
            .bind(("eid", extraction_id.to_string()))
            .await
            .map_err(backend)?;
        let rows: Vec<ReviewEventRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().map(StoredReviewEvent::from).collect())
    }
}
