//! Review progress summary.

use serde::{Deserialize, Serialize};

use crate::domain::{ExtractionRecord, ExtractionStatus};

/// Counts over a set of records and their fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_records: usize,
    pub pending_records: usize,
    pub verified_records: usize,
    pub failed_records: usize,
    pub total_fields: usize,
    pub verified_fields: usize,
    /// Fields whose value differs from the engine's.
    pub corrected_fields: usize,
    pub unverified_fields: usize,
    /// `verified_fields / total_fields`, 0 when there are no fields.
    pub verification_rate: f64,
}

impl ReviewStats {
    pub fn compute<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ExtractionRecord>,
    {
        let mut stats = ReviewStats::default();
        for record in records {
            stats.total_records += 1;
            match record.status() {
                ExtractionStatus::PendingVerification => stats.pending_records += 1,
                ExtractionStatus::Verified => stats.verified_records += 1,
                ExtractionStatus::VerificationFailed => stats.failed_records += 1,
            }
            stats.total_fields += record.fields().len();
            stats.verified_fields += record.verified_count();
            stats.corrected_fields += record.corrected_count();
        }
        stats.unverified_fields = stats.total_fields - stats.verified_fields;
        if stats.total_fields > 0 {
            stats.verification_rate = stats.verified_fields as f64 / stats.total_fields as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExtractionId, FieldPatch, NewExtraction, NewField};
    use crate::field_store::FieldStore;
    use chrono::Utc;

    fn record(id: &str, fields: usize) -> ExtractionRecord {
        ExtractionRecord::from_engine(NewExtraction {
            id: Some(ExtractionId::new(id)),
            document_id: "doc".to_string(),
            document_title: format!("{id}.pdf"),
            extracted_at: Utc::now(),
            confidence: 0.5,
            fields: (0..fields)
                .map(|i| NewField::text(format!("f{i}"), "n", "v"))
                .collect(),
        })
        .unwrap()
    }

    #[test]
    fn empty_set_has_zero_rate() {
        let stats = ReviewStats::compute(std::iter::empty());
        assert_eq!(stats, ReviewStats::default());
    }

    #[test]
    fn counts_statuses_and_fields() {
        let mut verified = record("a", 2);
        for id in ["f0", "f1"] {
            FieldStore::update_field(&mut verified, &id.into(), &FieldPatch::verified(true))
                .unwrap();
        }
        verified.recompute_status();

        let mut corrected = record("b", 2);
        FieldStore::update_field(&mut corrected, &"f0".into(), &FieldPatch::value("fixed"))
            .unwrap();

        let mut failed = record("c", 1);
        failed.mark_failed(None);

        let stats = ReviewStats::compute([&verified, &corrected, &failed]);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.verified_records, 1);
        assert_eq!(stats.pending_records, 1);
        assert_eq!(stats.failed_records, 1);
        assert_eq!(stats.total_fields, 5);
        assert_eq!(stats.verified_fields, 2);
        assert_eq!(stats.corrected_fields, 1);
        assert_eq!(stats.unverified_fields, 3);
        assert!((stats.verification_rate - 0.4).abs() < f64::EPSILON);
    }
}
