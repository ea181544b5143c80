//! Integration tests for the review workflow: field edits, derived status,
//! sticky failure and filtered listing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use docverify_core::{
    ExtractionFilter, ExtractionId, ExtractionRecord, ExtractionRepository, ExtractionStatus,
    FieldId, FieldPatch, NewExtraction, NewField, RetryPolicy, ValidationError,
    VerificationService, VerifyError,
};

const OP: &str = "reviewer-1";

fn new_extraction(id: &str, title: &str, fields: usize) -> NewExtraction {
    NewExtraction {
        id: Some(ExtractionId::new(id)),
        document_id: format!("doc-{id}"),
        document_title: title.to_string(),
        extracted_at: Utc.with_ymd_and_hms(2024, 1, 15, 14, 35, 0).unwrap(),
        confidence: 0.92,
        fields: (1..=fields)
            .map(|i| NewField::text(format!("f{i}"), format!("字段{i}"), format!("值{i}")))
            .collect(),
    }
}

fn service() -> VerificationService {
    VerificationService::new(Arc::new(ExtractionRepository::in_memory()))
        .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
}

async fn seeded(fields: usize) -> (VerificationService, ExtractionId) {
    let svc = service();
    let record = svc
        .import(new_extraction("ex-1", "采购合同.pdf", fields), "engine")
        .await
        .expect("import");
    (svc, record.id().clone())
}

async fn verify(svc: &VerificationService, id: &ExtractionId, field: &str) -> ExtractionStatus {
    svc.edit_field(id, &FieldId::new(field), &FieldPatch::verified(true), OP)
        .await
        .expect("verify field")
        .status()
}

fn status_matches_fields(record: &ExtractionRecord) -> bool {
    (record.status() == ExtractionStatus::Verified) == record.all_verified()
}

// ── Scenario A: verified one by one ──

#[tokio::test]
async fn scenario_a_last_field_promotes_record() {
    let (svc, id) = seeded(5).await;
    assert_eq!(
        svc.get(&id).unwrap().status(),
        ExtractionStatus::PendingVerification
    );

    for field in ["f1", "f2", "f3", "f4"] {
        assert_eq!(
            verify(&svc, &id, field).await,
            ExtractionStatus::PendingVerification
        );
    }
    assert_eq!(verify(&svc, &id, "f5").await, ExtractionStatus::Verified);
    assert!(status_matches_fields(&svc.get(&id).unwrap()));
}

#[tokio::test]
async fn unverifying_a_field_demotes_record() {
    let (svc, id) = seeded(2).await;
    verify(&svc, &id, "f1").await;
    verify(&svc, &id, "f2").await;

    let record = svc
        .edit_field(&id, &"f2".into(), &FieldPatch::verified(false), OP)
        .await
        .unwrap();
    assert_eq!(record.status(), ExtractionStatus::PendingVerification);
}

#[tokio::test]
async fn editing_value_does_not_verify() {
    let (svc, id) = seeded(1).await;
    let record = svc
        .edit_field(&id, &"f1".into(), &FieldPatch::value("修正值"), OP)
        .await
        .unwrap();
    let field = record.field(&"f1".into()).unwrap();
    assert_eq!(field.value(), "修正值");
    assert!(!field.is_verified());
    assert_eq!(record.status(), ExtractionStatus::PendingVerification);

    let record = svc
        .edit_field(
            &id,
            &"f1".into(),
            &FieldPatch::value("最终值").and_verified(true),
            OP,
        )
        .await
        .unwrap();
    assert_eq!(record.status(), ExtractionStatus::Verified);
    assert!(record.field(&"f1".into()).unwrap().is_corrected());
}

// ── Scenario B: unknown field ──

#[tokio::test]
async fn scenario_b_unknown_field_leaves_record_unchanged() {
    let (svc, id) = seeded(3).await;
    let before = svc.get(&id).unwrap();

    let err = svc
        .edit_field(&id, &"missing".into(), &FieldPatch::verified(true), OP)
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::FieldNotFound { .. }));
    assert!(err.is_not_found());
    assert_eq!(svc.get(&id).unwrap().as_ref(), before.as_ref());
}

#[tokio::test]
async fn unknown_extraction_is_not_found() {
    let svc = service();
    let ghost = ExtractionId::new("ghost");
    let err = svc
        .edit_field(&ghost, &"f1".into(), &FieldPatch::verified(true), OP)
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::ExtractionNotFound(_)));

    assert!(svc.mark_failed(&ghost, None, OP).await.is_err());
    assert!(svc.reopen(&ghost, OP).await.is_err());
    assert!(svc.get(&ghost).is_err());
    assert!(svc.history(&ghost).await.is_err());
}

// ── Scenario C: sticky failure ──

#[tokio::test]
async fn scenario_c_failure_is_sticky_until_reopen() {
    let (svc, id) = seeded(3).await;

    let failed = svc.mark_failed(&id, None, OP).await.unwrap();
    assert_eq!(failed.status(), ExtractionStatus::VerificationFailed);

    for field in ["f1", "f2", "f3"] {
        assert_eq!(
            verify(&svc, &id, field).await,
            ExtractionStatus::VerificationFailed
        );
    }

    let reopened = svc.reopen(&id, OP).await.unwrap();
    assert_eq!(reopened.status(), ExtractionStatus::PendingVerification);

    for field in ["f1", "f2", "f3"] {
        verify(&svc, &id, field).await;
    }
    assert_eq!(svc.get(&id).unwrap().status(), ExtractionStatus::Verified);

    let kinds: Vec<&'static str> = svc
        .history(&id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.action.kind())
        .collect();
    assert_eq!(kinds.first(), Some(&"imported"));
    assert!(kinds.contains(&"marked_failed"));
    assert!(kinds.contains(&"reopened"));
}

#[tokio::test]
async fn verified_record_can_be_failed() {
    let (svc, id) = seeded(1).await;
    verify(&svc, &id, "f1").await;
    let record = svc
        .mark_failed(&id, Some("wrong document".to_string()), OP)
        .await
        .unwrap();
    assert_eq!(record.status(), ExtractionStatus::VerificationFailed);
    assert_eq!(record.failure_reason(), Some("wrong document"));
}

// ── Scenario D: empty value ──

#[tokio::test]
async fn scenario_d_empty_value_is_rejected() {
    let (svc, id) = seeded(2).await;
    for bad in ["", "   "] {
        let err = svc
            .edit_field(&id, &"f1".into(), &FieldPatch::value(bad), OP)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Validation(ValidationError::EmptyValue { .. })
        ));
    }
    let record = svc.get(&id).unwrap();
    assert_eq!(record.field(&"f1".into()).unwrap().value(), "值1");
    assert_eq!(record.version(), 0);
}

// ── Idempotence ──

#[tokio::test]
async fn repeated_identical_edit_is_idempotent() {
    let (svc, id) = seeded(2).await;
    let patch = FieldPatch::value("新值").and_verified(true);

    let first = svc.edit_field(&id, &"f1".into(), &patch, OP).await.unwrap();
    let second = svc.edit_field(&id, &"f1".into(), &patch, OP).await.unwrap();

    assert_eq!(first.fields(), second.fields());
    assert_eq!(first.status(), second.status());
    assert_eq!(first.version(), second.version());

    let edits = svc
        .history(&id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.action.kind() == "field_edited")
        .count();
    assert_eq!(edits, 1);
}

// ── Filtering ──

async fn filter_fixture() -> VerificationService {
    let svc = service();
    for (id, title) in [
        ("c1", "采购合同_2024.pdf"),
        ("c2", "劳动合同.pdf"),
        ("i1", "发票_001.pdf"),
        ("x1", "CONTRACT-合同-EN.pdf"),
    ] {
        svc.import(new_extraction(id, title, 1), "engine")
            .await
            .unwrap();
    }
    for id in ["c1", "i1"] {
        verify(&svc, &ExtractionId::new(id), "f1").await;
    }
    svc
}

fn ids(records: &[Arc<ExtractionRecord>]) -> Vec<String> {
    let mut ids: Vec<String> = records.iter().map(|r| r.id().to_string()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn filter_text_and_status_are_anded() {
    let svc = filter_fixture().await;
    let verified: ExtractionStatus = "已验证".parse().unwrap();

    let both = svc
        .list(&ExtractionFilter::new().with_text("合同").with_status(verified))
        .unwrap();
    assert_eq!(ids(&both), vec!["c1"]);

    let text_only = svc.list(&ExtractionFilter::new().with_text("合同")).unwrap();
    assert_eq!(ids(&text_only), vec!["c1", "c2", "x1"]);

    let status_only = svc
        .list(&ExtractionFilter::new().with_status(verified))
        .unwrap();
    assert_eq!(ids(&status_only), vec!["c1", "i1"]);

    let neither = svc.list(&ExtractionFilter::new()).unwrap();
    assert_eq!(neither.len(), 4);
}

#[tokio::test]
async fn filter_text_is_case_insensitive() {
    let svc = filter_fixture().await;
    let found = svc
        .list(&ExtractionFilter::new().with_text("contract"))
        .unwrap();
    assert_eq!(ids(&found), vec!["x1"]);
}

#[tokio::test]
async fn list_is_repeatable_and_read_only() {
    let svc = filter_fixture().await;
    let filter = ExtractionFilter::new().with_text("合同");
    let first = svc.list(&filter).unwrap();
    let second = svc.list(&filter).unwrap();
    assert_eq!(first, second);
    assert!(first.iter().all(|r| status_matches_fields(r)));
}

// ── Export and stats ──

#[tokio::test]
async fn export_flattens_matching_records() {
    let svc = filter_fixture().await;
    let snapshot = svc
        .export(&ExtractionFilter::new().with_text("合同"))
        .unwrap();
    assert_eq!(snapshot.record_count, 3);
    assert_eq!(snapshot.row_count, 3);
    assert!(snapshot
        .rows
        .iter()
        .all(|row| row.document_title.contains("合同")));
}

#[tokio::test]
async fn stats_follow_filter() {
    let svc = filter_fixture().await;
    let stats = svc.stats(&ExtractionFilter::new()).unwrap();
    assert_eq!(stats.total_records, 4);
    assert_eq!(stats.verified_records, 2);
    assert_eq!(stats.pending_records, 2);
    assert_eq!(stats.verified_fields, 2);
}

// ── Import ──

#[tokio::test]
async fn duplicate_import_is_rejected() {
    let (svc, _) = seeded(1).await;
    let err = svc
        .import(new_extraction("ex-1", "again.pdf", 1), "engine")
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::AlreadyExists(_)));
}

#[tokio::test]
async fn invalid_import_is_rejected() {
    let svc = service();
    let err = svc
        .import(new_extraction("ex-1", "empty.pdf", 0), "engine")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VerifyError::Validation(ValidationError::NoFields)
    ));
    assert!(svc.list(&ExtractionFilter::new()).unwrap().is_empty());
}
