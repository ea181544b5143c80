//! Trait contract tests for ExtractionStore.
//!
//! Every check runs against the in-memory fake and the SurrealDB (`mem://`)
//! backend. Any conforming implementation must pass these.

use chrono::{Duration, TimeZone, Utc};
use docverify_state::fakes::MemoryExtractionStore;
use docverify_state::storage_traits::*;
use docverify_state::{StorageError, SurrealExtractionStore};
use serde_json::json;

fn row(id: &str, title: &str, version: u64, minutes_ago: i64) -> StoredExtraction {
    let base = Utc.with_ymd_and_hms(2024, 1, 15, 14, 35, 0).unwrap();
    StoredExtraction {
        extraction_id: id.to_string(),
        document_title: title.to_string(),
        status: "pending_verification".to_string(),
        extracted_at: base - Duration::minutes(minutes_ago),
        version,
        payload: json!({ "id": id, "version": version }),
    }
}

fn event(id: &str, extraction_id: &str, kind: &str, seconds: i64) -> StoredReviewEvent {
    StoredReviewEvent {
        event_id: id.to_string(),
        extraction_id: extraction_id.to_string(),
        kind: kind.to_string(),
        actor: "reviewer-1".to_string(),
        payload: json!({ "kind": kind }),
        timestamp: Utc.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap() + Duration::seconds(seconds),
    }
}

async fn surreal() -> SurrealExtractionStore {
    SurrealExtractionStore::in_memory()
        .await
        .expect("in_memory() failed")
}

// ===========================================================================
// Shared contract checks
// ===========================================================================

async fn check_insert_then_get(store: &dyn ExtractionStore) {
    store.insert(row("ex-1", "合同文档.pdf", 0, 0)).await.unwrap();
    let got = store.get("ex-1").await.unwrap();
    assert_eq!(got.document_title, "合同文档.pdf");
    assert_eq!(got.version, 0);
    assert_eq!(got.payload["id"], json!("ex-1"));
}

async fn check_insert_duplicate_rejected(store: &dyn ExtractionStore) {
    store.insert(row("ex-1", "a.pdf", 0, 0)).await.unwrap();
    let err = store.insert(row("ex-1", "b.pdf", 0, 0)).await.unwrap_err();
    assert!(matches!(err, StorageError::AlreadyExists { .. }));
    assert_eq!(store.get("ex-1").await.unwrap().document_title, "a.pdf");
}

async fn check_get_missing(store: &dyn ExtractionStore) {
    let err = store.get("nope").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

async fn check_put_requires_existing(store: &dyn ExtractionStore) {
    let err = store.put(row("ghost", "x.pdf", 1, 0)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

async fn check_put_newer_version_written(store: &dyn ExtractionStore) {
    store.insert(row("ex-1", "a.pdf", 0, 0)).await.unwrap();
    let mut next = row("ex-1", "a.pdf", 1, 0);
    next.status = "verified".to_string();
    assert_eq!(store.put(next).await.unwrap(), PutOutcome::Written);
    let got = store.get("ex-1").await.unwrap();
    assert_eq!(got.version, 1);
    assert_eq!(got.status, "verified");
}

async fn check_put_stale_version_dropped(store: &dyn ExtractionStore) {
    store.insert(row("ex-1", "a.pdf", 0, 0)).await.unwrap();
    store.put(row("ex-1", "a.pdf", 3, 0)).await.unwrap();
    let outcome = store.put(row("ex-1", "a.pdf", 2, 0)).await.unwrap();
    assert_eq!(outcome, PutOutcome::Stale { stored_version: 3 });
    assert_eq!(store.get("ex-1").await.unwrap().version, 3);
}

async fn check_put_same_version_is_idempotent(store: &dyn ExtractionStore) {
    store.insert(row("ex-1", "a.pdf", 0, 0)).await.unwrap();
    assert_eq!(
        store.put(row("ex-1", "a.pdf", 2, 0)).await.unwrap(),
        PutOutcome::Written
    );
    assert_eq!(
        store.put(row("ex-1", "a.pdf", 2, 0)).await.unwrap(),
        PutOutcome::Written
    );
}

async fn check_load_all_newest_first(store: &dyn ExtractionStore) {
    store.insert(row("old", "old.pdf", 0, 120)).await.unwrap();
    store.insert(row("new", "new.pdf", 0, 0)).await.unwrap();
    store.insert(row("mid", "mid.pdf", 0, 60)).await.unwrap();
    let ids: Vec<String> = store
        .load_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.extraction_id)
        .collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
}

async fn check_history_ordered_oldest_first(store: &dyn ExtractionStore) {
    store.insert(row("ex-1", "a.pdf", 0, 0)).await.unwrap();
    store
        .append_event(event("e2", "ex-1", "reopened", 20))
        .await
        .unwrap();
    store
        .append_event(event("e1", "ex-1", "marked_failed", 10))
        .await
        .unwrap();
    let kinds: Vec<String> = store
        .history("ex-1")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec!["marked_failed", "reopened"]);
}

async fn check_events_need_existing_record(store: &dyn ExtractionStore) {
    let err = store
        .append_event(event("e1", "ghost", "reopened", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
    assert!(store.history("ghost").await.is_err());
}

// ===========================================================================
// MemoryExtractionStore
// ===========================================================================

#[tokio::test]
async fn memory_insert_then_get() {
    check_insert_then_get(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_insert_duplicate_rejected() {
    check_insert_duplicate_rejected(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_get_missing() {
    check_get_missing(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_put_requires_existing() {
    check_put_requires_existing(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_put_newer_version_written() {
    check_put_newer_version_written(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_put_stale_version_dropped() {
    check_put_stale_version_dropped(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_put_same_version_is_idempotent() {
    check_put_same_version_is_idempotent(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_load_all_newest_first() {
    check_load_all_newest_first(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_history_ordered_oldest_first() {
    check_history_ordered_oldest_first(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_events_need_existing_record() {
    check_events_need_existing_record(&MemoryExtractionStore::new()).await;
}

#[tokio::test]
async fn memory_injected_failures_are_retryable_and_counted() {
    let store = MemoryExtractionStore::new();
    store.insert(row("ex-1", "a.pdf", 0, 0)).await.unwrap();
    store.fail_next_puts(2);

    for _ in 0..2 {
        let err = store.put(row("ex-1", "a.pdf", 1, 0)).await.unwrap_err();
        assert!(err.is_retryable());
    }
    assert_eq!(
        store.put(row("ex-1", "a.pdf", 1, 0)).await.unwrap(),
        PutOutcome::Written
    );
    assert_eq!(store.put_calls(), 3);
}

// ===========================================================================
// SurrealExtractionStore (mirrors the memory tests above)
// ===========================================================================

#[tokio::test]
async fn surreal_insert_then_get() {
    check_insert_then_get(&surreal().await).await;
}

#[tokio::test]
async fn surreal_insert_duplicate_rejected() {
    check_insert_duplicate_rejected(&surreal().await).await;
}

#[tokio::test]
async fn surreal_get_missing() {
    check_get_missing(&surreal().await).await;
}

#[tokio::test]
async fn surreal_put_requires_existing() {
    check_put_requires_existing(&surreal().await).await;
}

#[tokio::test]
async fn surreal_put_newer_version_written() {
    check_put_newer_version_written(&surreal().await).await;
}

#[tokio::test]
async fn surreal_put_stale_version_dropped() {
    check_put_stale_version_dropped(&surreal().await).await;
}

#[tokio::test]
async fn surreal_put_same_version_is_idempotent() {
    check_put_same_version_is_idempotent(&surreal().await).await;
}

#[tokio::test]
async fn surreal_load_all_newest_first() {
    check_load_all_newest_first(&surreal().await).await;
}

#[tokio::test]
async fn surreal_history_ordered_oldest_first() {
    check_history_ordered_oldest_first(&surreal().await).await;
}

#[tokio::test]
async fn surreal_events_need_existing_record() {
    check_events_need_existing_record(&surreal().await).await;
}
