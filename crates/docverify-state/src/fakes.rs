//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryExtractionStore`, which satisfies the `ExtractionStore`
//! contract without any external dependencies and can be told to fail the
//! next N writes to exercise retry paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug, Default)]
struct Inner {
    rows: HashMap<String, StoredExtraction>,
    events: HashMap<String, Vec<StoredReviewEvent>>,
    failing_puts: u32,
    put_calls: u64,
}

/// In-memory extraction store backed by `HashMap`s.
#[derive(Debug, Default)]
pub struct MemoryExtractionStore {
    inner: Mutex<Inner>,
}

impl MemoryExtractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `put` fail with `StorageError::Unavailable`.
    pub fn fail_next_puts(&self, count: u32) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_puts = count;
        }
    }

    /// Number of `put` calls seen so far, failed ones included.
    pub fn put_calls(&self) -> u64 {
        self.inner.lock().map(|i| i.put_calls).unwrap_or(0)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ExtractionStore for MemoryExtractionStore {
    async fn insert(&self, row: StoredExtraction) -> StorageResult<()> {
        let mut inner = self.lock()?;
        if inner.rows.contains_key(&row.extraction_id) {
            return Err(StorageError::AlreadyExists {
                extraction_id: row.extraction_id,
            });
        }
        inner.rows.insert(row.extraction_id.clone(), row);
        Ok(())
    }

    async fn put(&self, row: StoredExtraction) -> StorageResult<PutOutcome> {
        let mut inner = self.lock()?;
        inner.put_calls += 1;
        if inner.failing_puts > 0 {
            inner.failing_puts -= 1;
            return Err(StorageError::Unavailable(format!(
                "injected failure writing {}",
                row.extraction_id
            )));
        }
        let stored = inner
            .rows
            .get_mut(&row.extraction_id)
            .ok_or_else(|| StorageError::NotFound {
                extraction_id: row.extraction_id.clone(),
            })?;
        if row.version < stored.version {
            return Ok(PutOutcome::Stale {
                stored_version: stored.version,
            });
        }
        *stored = row;
        Ok(PutOutcome::Written)
    }

    async fn get(&self, extraction_id: &str) -> StorageResult<StoredExtraction> {
        let inner = self.lock()?;
        inner
            .rows
            .get(extraction_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                extraction_id: extraction_id.to_string(),
            })
    }

    async fn load_all(&self) -> StorageResult<Vec<StoredExtraction>> {
        let inner = self.lock()?;
        let mut rows: Vec<StoredExtraction> = inner.rows.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.extracted_at
                .cmp(&a.extracted_at)
                .then_with(|| a.extraction_id.cmp(&b.extraction_id))
        });
        Ok(rows)
    }

    async fn append_event(&self, event: StoredReviewEvent) -> StorageResult<()> {
        let mut inner = self.lock()?;
        if !inner.rows.contains_key(&event.extraction_id) {
            return Err(StorageError::NotFound {
                extraction_id: event.extraction_id,
            });
        }
        inner
            .events
            .entry(event.extraction_id.clone())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn history(&self, extraction_id: &str) -> StorageResult<Vec<StoredReviewEvent>> {
        let inner = self.lock()?;
        if !inner.rows.contains_key(extraction_id) {
            return Err(StorageError::NotFound {
                extraction_id: extraction_id.to_string(),
            });
        }
        let mut events = inner.events.get(extraction_id).cloned().unwrap_or_default();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}
