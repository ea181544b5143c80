//! Verification service: the only entry point used by the daemon and CLI.
//!
//! Mutations follow one sequence per call:
//! lock record -> apply -> recompute status -> commit in memory -> unlock
//! -> audit entry -> durable write with bounded retry.
//!
//! A durable write that keeps failing is reported as a retryable
//! `Persistence` error. The in-memory change and its audit entry stay;
//! re-issuing the same call is a no-op in memory and writes the current
//! snapshot again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use docverify_state::PutOutcome;
use tracing::{debug, Instrument};

use crate::audit::{ReviewAction, ReviewEvent};
use crate::domain::{
    ExtractionFilter, ExtractionId, ExtractionRecord, ExtractionStatus, FieldId, FieldPatch,
    NewExtraction, Result, VerifyError,
};
use crate::export::ExportSnapshot;
use crate::field_store::FieldStore;
use crate::metrics::METRICS;
use crate::obs;
use crate::repository::ExtractionRepository;
use crate::stats::ReviewStats;

/// Bounded retry for durable writes. Backoff grows linearly per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

pub struct VerificationService {
    repo: Arc<ExtractionRepository>,
    retry: RetryPolicy,
}

impl VerificationService {
    pub fn new(repo: Arc<ExtractionRepository>) -> Self {
        Self {
            repo,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn repository(&self) -> &Arc<ExtractionRepository> {
        &self.repo
    }

    /// Engine hand-off: validate and store a new record.
    pub async fn import(&self, new: NewExtraction, actor: &str) -> Result<Arc<ExtractionRecord>> {
        let record = ExtractionRecord::from_engine(new)?;
        let span = obs::record_span(record.id().as_str());
        async move {
            let record = self.repo.insert(record).await?;
            METRICS.inc_records_imported();
            obs::emit_record_imported(
                record.id().as_str(),
                record.fields().len(),
                record.confidence(),
            );
            self.audit(ReviewEvent::new(
                record.id().clone(),
                actor,
                ReviewAction::Imported {
                    field_count: record.fields().len(),
                },
                record.status(),
                record.status(),
                record.version(),
            ))
            .await;
            Ok(record)
        }
        .instrument(span)
        .await
    }

    /// Apply a field patch and re-derive the record status.
    pub async fn edit_field(
        &self,
        extraction_id: &ExtractionId,
        field_id: &FieldId,
        patch: &FieldPatch,
        actor: &str,
    ) -> Result<Arc<ExtractionRecord>> {
        async move {
            let lock = self.repo.lock(extraction_id).await?;
            let mut record = lock.load()?;
            let status_before = record.status();
            let previous = record.field(field_id).cloned();

            let updated = FieldStore::update_field(&mut record, field_id, patch)?;
            let status_after = record.recompute_status();

            let field_changed = previous.as_ref() != Some(&updated);
            let committed = if field_changed || status_before != status_after {
                Some(lock.commit(record)?)
            } else {
                None
            };
            let snapshot = match &committed {
                Some(c) => Arc::clone(c),
                None => lock.current()?,
            };
            // Built under the lock so event timestamps follow version order.
            let event = match (&committed, previous) {
                (Some(c), Some(previous)) => Some(ReviewEvent::new(
                    extraction_id.clone(),
                    actor,
                    ReviewAction::FieldEdited {
                        field_id: field_id.clone(),
                        previous_value: previous.value().to_string(),
                        value: updated.value().to_string(),
                        previous_verified: previous.is_verified(),
                        verified: updated.is_verified(),
                        comment: patch.note(),
                    },
                    status_before,
                    status_after,
                    c.version(),
                )),
                _ => None,
            };
            drop(lock);

            if committed.is_some() {
                METRICS.inc_edits_applied();
                obs::emit_field_edited(
                    extraction_id.as_str(),
                    field_id.as_str(),
                    updated.is_verified(),
                    snapshot.version(),
                );
                self.note_transition(extraction_id, status_before, status_after);
            } else {
                debug!(field_id = %field_id, "patch left record unchanged");
            }
            // The audit entry is written before the durable write so that a
            // failed persist followed by a no-op re-issue still leaves it.
            if let Some(event) = event {
                self.audit(event).await;
            }

            self.persist(&snapshot).await?;
            Ok(snapshot)
        }
        .instrument(obs::record_span(extraction_id.as_str()))
        .await
    }

    /// Operator rejection. Sticky until [`reopen`](Self::reopen).
    pub async fn mark_failed(
        &self,
        extraction_id: &ExtractionId,
        reason: Option<String>,
        actor: &str,
    ) -> Result<Arc<ExtractionRecord>> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.transition(
            extraction_id,
            actor,
            ReviewAction::MarkedFailed {
                reason: reason.clone(),
            },
            move |record| record.mark_failed(reason),
        )
        .await
    }

    /// Clear a failure verdict back to `PendingVerification`.
    pub async fn reopen(
        &self,
        extraction_id: &ExtractionId,
        actor: &str,
    ) -> Result<Arc<ExtractionRecord>> {
        self.transition(
            extraction_id,
            actor,
            ReviewAction::Reopened,
            ExtractionRecord::reopen,
        )
        .await
    }

    pub fn get(&self, extraction_id: &ExtractionId) -> Result<Arc<ExtractionRecord>> {
        self.repo.get(extraction_id)
    }

    pub fn list(&self, filter: &ExtractionFilter) -> Result<Vec<Arc<ExtractionRecord>>> {
        self.repo.list(filter)
    }

    /// Flattened snapshot of every matching record, one row per field.
    pub fn export(&self, filter: &ExtractionFilter) -> Result<ExportSnapshot> {
        let records = self.repo.list(filter)?;
        ExportSnapshot::build(records.iter().map(|r| r.as_ref()), Utc::now())
    }

    pub fn stats(&self, filter: &ExtractionFilter) -> Result<ReviewStats> {
        let records = self.repo.list(filter)?;
        Ok(ReviewStats::compute(records.iter().map(|r| r.as_ref())))
    }

    /// Audit trail of one record, oldest first.
    pub async fn history(&self, extraction_id: &ExtractionId) -> Result<Vec<ReviewEvent>> {
        self.repo.history(extraction_id).await
    }

    async fn transition<F>(
        &self,
        extraction_id: &ExtractionId,
        actor: &str,
        action: ReviewAction,
        apply: F,
    ) -> Result<Arc<ExtractionRecord>>
    where
        F: FnOnce(&mut ExtractionRecord),
    {
        async move {
            let lock = self.repo.lock(extraction_id).await?;
            let mut record = lock.load()?;
            let before = lock.current()?;
            let status_before = record.status();
            apply(&mut record);

            let changed = record.status() != before.status()
                || record.failure_reason() != before.failure_reason();
            let committed = if changed {
                Some(lock.commit(record)?)
            } else {
                None
            };
            let snapshot = committed.clone().unwrap_or(before);
            let event = committed.as_ref().map(|c| {
                ReviewEvent::new(
                    extraction_id.clone(),
                    actor,
                    action,
                    status_before,
                    c.status(),
                    c.version(),
                )
            });
            drop(lock);

            if let Some(event) = event {
                self.note_transition(extraction_id, status_before, event.status_after);
                self.audit(event).await;
            }

            self.persist(&snapshot).await?;
            Ok(snapshot)
        }
        .instrument(obs::record_span(extraction_id.as_str()))
        .await
    }

    fn note_transition(&self, id: &ExtractionId, from: ExtractionStatus, to: ExtractionStatus) {
        if from != to {
            METRICS.inc_status_transitions();
            obs::emit_status_changed(id.as_str(), from, to);
        }
    }

    /// Durable write of `record` with bounded retry.
    ///
    /// Only retryable storage errors are retried. A stale outcome means a
    /// newer snapshot already reached the store and counts as success.
    async fn persist(&self, record: &ExtractionRecord) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.repo.persist(record).await {
                Ok(PutOutcome::Written) => return Ok(()),
                Ok(PutOutcome::Stale { stored_version }) => {
                    debug!(
                        version = record.version(),
                        stored_version, "newer snapshot already persisted"
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    METRICS.inc_persist_retries();
                    obs::emit_persist_retry(record.id().as_str(), attempt, &e);
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                }
                Err(e) => {
                    METRICS.inc_persist_failures();
                    obs::emit_persist_failed(record.id().as_str(), attempt, &e);
                    return Err(VerifyError::Persistence {
                        extraction_id: record.id().clone(),
                        attempts: attempt,
                        retryable: e.is_retryable(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Audit entries are best effort: a failed append never undoes the change.
    async fn audit(&self, event: ReviewEvent) {
        if let Err(e) = self.repo.record_event(&event).await {
            obs::emit_audit_write_failed(event.extraction_id.as_str(), &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewField;

    fn new_extraction(id: &str, fields: usize) -> NewExtraction {
        NewExtraction {
            id: Some(ExtractionId::new(id)),
            document_id: format!("doc-{id}"),
            document_title: format!("{id}.pdf"),
            extracted_at: Utc::now(),
            confidence: 0.88,
            fields: (1..=fields)
                .map(|i| NewField::text(format!("f{i}"), format!("字段{i}"), format!("v{i}")))
                .collect(),
        }
    }

    fn service() -> VerificationService {
        VerificationService::new(Arc::new(ExtractionRepository::in_memory()))
            .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
    }

    #[tokio::test]
    async fn unchanged_edit_does_not_bump_version() {
        let svc = service();
        let id = svc.import(new_extraction("a", 2), "engine").await.unwrap().id().clone();

        let first = svc
            .edit_field(&id, &"f1".into(), &FieldPatch::verified(true), "op")
            .await
            .unwrap();
        let second = svc
            .edit_field(&id, &"f1".into(), &FieldPatch::verified(true), "op")
            .await
            .unwrap();
        assert_eq!(first.version(), 1);
        assert_eq!(second.version(), 1);
        assert_eq!(first.as_ref(), second.as_ref());
    }

    #[tokio::test]
    async fn mark_failed_trims_reason_and_audits() {
        let svc = service();
        let id = svc.import(new_extraction("a", 1), "engine").await.unwrap().id().clone();

        let failed = svc
            .mark_failed(&id, Some("  扫描不清晰 ".to_string()), "op-1")
            .await
            .unwrap();
        assert_eq!(failed.status(), ExtractionStatus::VerificationFailed);
        assert_eq!(failed.failure_reason(), Some("扫描不清晰"));

        let history = svc.history(&id).await.unwrap();
        let kinds: Vec<&str> = history.iter().map(|e| e.action.kind()).collect();
        assert_eq!(kinds, vec!["imported", "marked_failed"]);
        assert_eq!(history[1].actor, "op-1");
        assert_eq!(history[1].status_after, ExtractionStatus::VerificationFailed);
    }

    #[tokio::test]
    async fn reopen_on_pending_is_a_no_op() {
        let svc = service();
        let id = svc.import(new_extraction("a", 1), "engine").await.unwrap().id().clone();
        let reopened = svc.reopen(&id, "op").await.unwrap();
        assert_eq!(reopened.version(), 0);
        assert_eq!(svc.history(&id).await.unwrap().len(), 1);
    }

    #[test]
    fn retry_delay_grows_linearly() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        assert_eq!(policy.delay(1), Duration::from_millis(20));
        assert_eq!(policy.delay(2), Duration::from_millis(40));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
