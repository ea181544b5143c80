//! Extraction records and their derived verification status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::confidence::ConfidenceBand;
use super::error::ValidationError;
use super::field::{Field, FieldId, FieldKind};

/// Identifier of an extraction record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionId(String);

impl ExtractionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier for records handed off without one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExtractionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ExtractionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Review status of an extraction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    #[serde(alias = "PendingVerification", alias = "待验证")]
    PendingVerification,
    #[serde(alias = "Verified", alias = "已验证")]
    Verified,
    #[serde(alias = "VerificationFailed", alias = "验证失败")]
    VerificationFailed,
}

impl ExtractionStatus {
    pub const ALL: [ExtractionStatus; 3] = [
        ExtractionStatus::PendingVerification,
        ExtractionStatus::Verified,
        ExtractionStatus::VerificationFailed,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::PendingVerification => "pending_verification",
            ExtractionStatus::Verified => "verified",
            ExtractionStatus::VerificationFailed => "verification_failed",
        }
    }

    /// Label shown in the review console.
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionStatus::PendingVerification => "待验证",
            ExtractionStatus::Verified => "已验证",
            ExtractionStatus::VerificationFailed => "验证失败",
        }
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending_verification" | "PendingVerification" | "待验证" => {
                Ok(ExtractionStatus::PendingVerification)
            }
            "verified" | "Verified" | "已验证" => Ok(ExtractionStatus::Verified),
            "verification_failed" | "VerificationFailed" | "验证失败" => {
                Ok(ExtractionStatus::VerificationFailed)
            }
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Field as delivered by the extraction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewField {
    pub id: FieldId,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl NewField {
    pub fn text(id: impl Into<FieldId>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: value.into(),
            confidence: None,
            kind: FieldKind::Text,
            pattern: None,
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

/// Extraction hand-off payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExtraction {
    /// Assigned when absent.
    #[serde(default)]
    pub id: Option<ExtractionId>,
    pub document_id: String,
    pub document_title: String,
    #[serde(default = "Utc::now")]
    pub extracted_at: DateTime<Utc>,
    pub confidence: f64,
    pub fields: Vec<NewField>,
}

fn check_confidence(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ConfidenceOutOfRange { value })
    }
}

/// One document's extracted data under review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    id: ExtractionId,
    document_id: String,
    document_title: String,
    extracted_at: DateTime<Utc>,
    confidence: f64,
    fields: Vec<Field>,
    status: ExtractionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl ExtractionRecord {
    /// Build a record from an engine hand-off.
    ///
    /// Every field starts unverified and the record starts in
    /// `PendingVerification` at version 0.
    pub fn from_engine(new: NewExtraction) -> Result<Self, ValidationError> {
        if new.document_id.trim().is_empty() {
            return Err(ValidationError::MissingAttribute {
                attribute: "document_id",
            });
        }
        if new.document_title.trim().is_empty() {
            return Err(ValidationError::MissingAttribute {
                attribute: "document_title",
            });
        }
        check_confidence(new.confidence)?;
        if new.fields.is_empty() {
            return Err(ValidationError::NoFields);
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(new.fields.len());
        for nf in new.fields {
            if nf.id.as_str().trim().is_empty() {
                return Err(ValidationError::MissingAttribute {
                    attribute: "field id",
                });
            }
            if !seen.insert(nf.id.clone()) {
                return Err(ValidationError::DuplicateField(nf.id));
            }
            if let Some(pattern) = &nf.pattern {
                regex::Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
                    field_id: nf.id.clone(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            }

            let mut field = Field::new(nf.id, nf.name, nf.value).with_kind(nf.kind);
            if let Some(c) = nf.confidence {
                check_confidence(c)?;
                field = field.with_confidence(c);
            }
            if let Some(p) = nf.pattern {
                field = field.with_pattern(p);
            }
            fields.push(field);
        }

        let id = match new.id {
            Some(id) if !id.as_str().trim().is_empty() => id,
            Some(_) => {
                return Err(ValidationError::MissingAttribute {
                    attribute: "extraction id",
                })
            }
            None => ExtractionId::generate(),
        };

        Ok(Self {
            id,
            document_id: new.document_id,
            document_title: new.document_title,
            extracted_at: new.extracted_at,
            confidence: new.confidence,
            fields,
            status: ExtractionStatus::PendingVerification,
            failure_reason: None,
            version: 0,
            updated_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &ExtractionId {
        &self.id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn document_title(&self) -> &str {
        &self.document_title
    }

    pub fn extracted_at(&self) -> DateTime<Utc> {
        self.extracted_at
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::from_score(self.confidence)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id() == id)
    }

    pub(crate) fn field_mut(&mut self, id: &FieldId) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id() == id)
    }

    pub fn status(&self) -> ExtractionStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when there is at least one field and every field is verified.
    pub fn all_verified(&self) -> bool {
        !self.fields.is_empty() && self.fields.iter().all(Field::is_verified)
    }

    pub fn verified_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_verified()).count()
    }

    pub fn corrected_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_corrected()).count()
    }

    /// Re-derive status from field state.
    ///
    /// `VerificationFailed` is sticky and survives field edits; only
    /// [`reopen`](Self::reopen) clears it.
    pub fn recompute_status(&mut self) -> ExtractionStatus {
        if self.status != ExtractionStatus::VerificationFailed {
            self.status = if self.all_verified() {
                ExtractionStatus::Verified
            } else {
                ExtractionStatus::PendingVerification
            };
        }
        self.status
    }

    /// Operator rejection, regardless of field state.
    pub fn mark_failed(&mut self, reason: Option<String>) {
        self.status = ExtractionStatus::VerificationFailed;
        self.failure_reason = reason;
    }

    /// Back to `PendingVerification`, regardless of field state. The next
    /// recompute follows the normal rules.
    pub fn reopen(&mut self) {
        self.status = ExtractionStatus::PendingVerification;
        self.failure_reason = None;
    }

    pub(crate) fn advance(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_extraction(fields: usize) -> NewExtraction {
        NewExtraction {
            id: Some(ExtractionId::new("ex-1")),
            document_id: "doc-1".to_string(),
            document_title: "合同_A.pdf".to_string(),
            extracted_at: Utc::now(),
            confidence: 0.93,
            fields: (1..=fields)
                .map(|i| NewField::text(format!("f{i}"), format!("字段{i}"), format!("v{i}")))
                .collect(),
        }
    }

    fn verify_all(record: &mut ExtractionRecord) {
        for field in record.fields.iter_mut() {
            field.set_verified(true);
        }
    }

    #[test]
    fn from_engine_starts_pending_and_unverified() {
        let record = ExtractionRecord::from_engine(new_extraction(3)).unwrap();
        assert_eq!(record.status(), ExtractionStatus::PendingVerification);
        assert_eq!(record.version(), 0);
        assert!(record.fields().iter().all(|f| !f.is_verified()));
        assert_eq!(record.confidence_band(), ConfidenceBand::High);
    }

    #[test]
    fn from_engine_rejects_bad_input() {
        let mut bad = new_extraction(2);
        bad.confidence = 1.5;
        assert!(matches!(
            ExtractionRecord::from_engine(bad),
            Err(ValidationError::ConfidenceOutOfRange { .. })
        ));

        assert!(matches!(
            ExtractionRecord::from_engine(new_extraction(0)),
            Err(ValidationError::NoFields)
        ));

        let mut dup = new_extraction(2);
        dup.fields[1].id = FieldId::new("f1");
        assert!(matches!(
            ExtractionRecord::from_engine(dup),
            Err(ValidationError::DuplicateField(_))
        ));

        let mut bad_pattern = new_extraction(1);
        bad_pattern.fields[0].pattern = Some("([".to_string());
        assert!(matches!(
            ExtractionRecord::from_engine(bad_pattern),
            Err(ValidationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn from_engine_generates_missing_id() {
        let mut new = new_extraction(1);
        new.id = None;
        let record = ExtractionRecord::from_engine(new).unwrap();
        assert!(!record.id().as_str().is_empty());
    }

    #[test]
    fn recompute_promotes_and_demotes() {
        let mut record = ExtractionRecord::from_engine(new_extraction(2)).unwrap();
        assert_eq!(record.recompute_status(), ExtractionStatus::PendingVerification);

        verify_all(&mut record);
        assert_eq!(record.recompute_status(), ExtractionStatus::Verified);

        record.fields[0].set_verified(false);
        assert_eq!(record.recompute_status(), ExtractionStatus::PendingVerification);
    }

    #[test]
    fn failure_is_sticky_until_reopen() {
        let mut record = ExtractionRecord::from_engine(new_extraction(2)).unwrap();
        record.mark_failed(Some("illegible scan".to_string()));
        verify_all(&mut record);
        assert_eq!(record.recompute_status(), ExtractionStatus::VerificationFailed);
        assert_eq!(record.failure_reason(), Some("illegible scan"));

        record.reopen();
        assert_eq!(record.status(), ExtractionStatus::PendingVerification);
        assert_eq!(record.failure_reason(), None);
        assert_eq!(record.recompute_status(), ExtractionStatus::Verified);
    }

    #[test]
    fn status_parses_wire_names_and_labels() {
        assert_eq!(
            "已验证".parse::<ExtractionStatus>().unwrap(),
            ExtractionStatus::Verified
        );
        assert_eq!(
            "verification_failed".parse::<ExtractionStatus>().unwrap(),
            ExtractionStatus::VerificationFailed
        );
        assert_eq!(
            "PendingVerification".parse::<ExtractionStatus>().unwrap(),
            ExtractionStatus::PendingVerification
        );
        assert!("done".parse::<ExtractionStatus>().is_err());

        let parsed: ExtractionStatus = serde_json::from_str("\"待验证\"").unwrap();
        assert_eq!(parsed, ExtractionStatus::PendingVerification);
        assert_eq!(
            serde_json::to_string(&ExtractionStatus::Verified).unwrap(),
            "\"verified\""
        );
    }
}
