//! Canonical in-memory collection of extraction records.
//!
//! Each record lives in its own slot:
//! - a writer lock (`tokio::sync::Mutex`) serialising read-modify-write
//!   sequences on that record only
//! - the current snapshot behind a short-lived `RwLock<Arc<_>>`, so readers
//!   clone an `Arc` and never wait on writers
//!
//! The durable [`ExtractionStore`] is written separately from the in-memory
//! commit; see [`ExtractionRepository::persist`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use docverify_state::fakes::MemoryExtractionStore;
use docverify_state::{ExtractionStore, PutOutcome, StorageError, StorageResult, StoredExtraction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::audit::ReviewEvent;
use crate::domain::{ExtractionFilter, ExtractionId, ExtractionRecord, Result, VerifyError};

fn poisoned(what: &str) -> VerifyError {
    VerifyError::LockPoisoned(format!("{what} lock poisoned"))
}

struct RecordSlot {
    writer: Arc<Mutex<()>>,
    current: RwLock<Arc<ExtractionRecord>>,
}

impl RecordSlot {
    fn new(record: ExtractionRecord) -> Self {
        Self {
            writer: Arc::new(Mutex::new(())),
            current: RwLock::new(Arc::new(record)),
        }
    }

    fn snapshot(&self) -> Result<Arc<ExtractionRecord>> {
        self.current
            .read()
            .map(|current| Arc::clone(&current))
            .map_err(|_| poisoned("record"))
    }
}

/// Exclusive write access to one record.
///
/// Dropping the lock releases it. Hold it only around the in-memory
/// mutation, never across durable I/O.
pub struct RecordLock {
    extraction_id: ExtractionId,
    slot: Arc<RecordSlot>,
    _guard: OwnedMutexGuard<()>,
}

impl RecordLock {
    pub fn extraction_id(&self) -> &ExtractionId {
        &self.extraction_id
    }

    /// Current committed snapshot.
    pub fn current(&self) -> Result<Arc<ExtractionRecord>> {
        self.slot.snapshot()
    }

    /// Private working copy of the current record.
    pub fn load(&self) -> Result<ExtractionRecord> {
        let current = self.current()?;
        Ok(ExtractionRecord::clone(&current))
    }

    /// Replace the current snapshot with `record`.
    ///
    /// `record` must carry the version it was loaded at; the committed copy
    /// gets the next version.
    pub fn commit(&self, mut record: ExtractionRecord) -> Result<Arc<ExtractionRecord>> {
        let mut current = self.slot.current.write().map_err(|_| poisoned("record"))?;
        if record.id() != &self.extraction_id || record.version() != current.version() {
            return Err(VerifyError::Conflict {
                extraction_id: self.extraction_id.clone(),
                expected: record.version(),
                actual: current.version(),
            });
        }
        record.advance(Utc::now());
        let committed = Arc::new(record);
        *current = Arc::clone(&committed);
        debug!(extraction_id = %self.extraction_id, version = committed.version(), "record committed");
        Ok(committed)
    }
}

/// Owns every extraction record and the durable store behind them.
pub struct ExtractionRepository {
    records: RwLock<HashMap<ExtractionId, Arc<RecordSlot>>>,
    store: Arc<dyn ExtractionStore>,
}

impl ExtractionRepository {
    /// Empty repository writing through to `store`.
    pub fn new(store: Arc<dyn ExtractionStore>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Empty repository over an in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryExtractionStore::new()))
    }

    /// Load every record held by `store`.
    ///
    /// Rows whose payload no longer decodes are skipped with a warning so one
    /// bad row cannot keep the others offline.
    pub async fn open(store: Arc<dyn ExtractionStore>) -> Result<Self> {
        let rows = store.load_all().await?;
        let mut records = HashMap::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<ExtractionRecord>(row.payload) {
                Ok(record) => {
                    records.insert(record.id().clone(), Arc::new(RecordSlot::new(record)));
                }
                Err(e) => {
                    warn!(extraction_id = %row.extraction_id, error = %e, "skipping undecodable record");
                }
            }
        }
        info!(records = records.len(), "extraction repository opened");
        Ok(Self {
            records: RwLock::new(records),
            store,
        })
    }

    pub fn store(&self) -> &Arc<dyn ExtractionStore> {
        &self.store
    }

    fn slot(&self, id: &ExtractionId) -> Result<Arc<RecordSlot>> {
        let records = self.records.read().map_err(|_| poisoned("repository"))?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| VerifyError::ExtractionNotFound(id.clone()))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self
            .records
            .read()
            .map_err(|_| poisoned("repository"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Current snapshot of one record.
    pub fn get(&self, id: &ExtractionId) -> Result<Arc<ExtractionRecord>> {
        self.slot(id)?.snapshot()
    }

    /// Records matching `filter`, newest extraction first, ties by id.
    pub fn list(&self, filter: &ExtractionFilter) -> Result<Vec<Arc<ExtractionRecord>>> {
        let slots: Vec<Arc<RecordSlot>> = self
            .records
            .read()
            .map_err(|_| poisoned("repository"))?
            .values()
            .cloned()
            .collect();

        let mut matched = Vec::with_capacity(slots.len());
        for slot in slots {
            let record = slot.snapshot()?;
            if filter.matches(&record) {
                matched.push(record);
            }
        }
        matched.sort_by(|a, b| {
            b.extracted_at()
                .cmp(&a.extracted_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(matched)
    }

    /// Acquire the writer lock of one record.
    pub async fn lock(&self, id: &ExtractionId) -> Result<RecordLock> {
        let slot = self.slot(id)?;
        let guard = Arc::clone(&slot.writer).lock_owned().await;
        Ok(RecordLock {
            extraction_id: id.clone(),
            slot,
            _guard: guard,
        })
    }

    /// Replace an existing record in memory.
    ///
    /// Fails with `ExtractionNotFound` when the id is unknown and `Conflict`
    /// when `record` was loaded at an older version than the current one.
    pub async fn save(&self, record: ExtractionRecord) -> Result<Arc<ExtractionRecord>> {
        let lock = self.lock(record.id()).await?;
        lock.commit(record)
    }

    /// Add a freshly handed-off record, durably first.
    pub async fn insert(&self, record: ExtractionRecord) -> Result<Arc<ExtractionRecord>> {
        let id = record.id().clone();
        if self
            .records
            .read()
            .map_err(|_| poisoned("repository"))?
            .contains_key(&id)
        {
            return Err(VerifyError::AlreadyExists(id));
        }

        self.store.insert(to_stored(&record)?).await?;

        let mut records = self.records.write().map_err(|_| poisoned("repository"))?;
        if records.contains_key(&id) {
            return Err(VerifyError::AlreadyExists(id));
        }
        let slot = Arc::new(RecordSlot::new(record));
        let snapshot = slot.snapshot()?;
        records.insert(id, slot);
        Ok(snapshot)
    }

    /// Write one snapshot to the durable store. Single attempt.
    ///
    /// Older versions than the stored one are dropped by the store, so
    /// persists finishing out of order cannot regress durable state.
    pub async fn persist(&self, record: &ExtractionRecord) -> StorageResult<PutOutcome> {
        let row = to_stored(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.put(row).await
    }

    pub async fn record_event(&self, event: &ReviewEvent) -> Result<()> {
        self.store.append_event(event.to_stored()?).await?;
        Ok(())
    }

    /// Audit trail of one record, oldest first.
    pub async fn history(&self, id: &ExtractionId) -> Result<Vec<ReviewEvent>> {
        self.slot(id)?;
        let stored = self.store.history(id.as_str()).await?;
        stored.into_iter().map(ReviewEvent::from_stored).collect()
    }
}

fn to_stored(record: &ExtractionRecord) -> Result<StoredExtraction> {
    Ok(StoredExtraction {
        extraction_id: record.id().to_string(),
        document_title: record.document_title().to_string(),
        status: record.status().as_str().to_string(),
        extracted_at: record.extracted_at(),
        version: record.version(),
        payload: serde_json::to_value(record)?,
    })
}
