//! Extracted fields and field patches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a field, unique within its extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FieldId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Value type rule applied when an operator edits a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    #[default]
    Text,
    /// Calendar date, stored as `YYYY-MM-DD`.
    Date,
    /// Monetary amount; must contain a number once symbols are removed.
    Amount,
    /// One of a fixed set of values, matched case-insensitively.
    Enum { values: Vec<String> },
}

/// One named, extracted value within an extraction record.
///
/// `id`, `name`, `original_value`, `confidence`, `kind` and `pattern` are
/// fixed at hand-off. Only `value` and `verified` change, and only through
/// [`crate::FieldStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    id: FieldId,
    name: String,
    value: String,
    original_value: String,
    verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    #[serde(default)]
    kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
}

impl Field {
    /// Create an unverified text field as produced by the extraction engine.
    pub fn new(id: impl Into<FieldId>, name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            id: id.into(),
            name: name.into(),
            original_value: value.clone(),
            value,
            verified: false,
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

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn id(&self) -> &FieldId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// The operator changed the engine's value.
    pub fn is_corrected(&self) -> bool {
        self.value != self.original_value
    }

    pub(crate) fn set_value(&mut self, value: String) {
        self.value = value;
    }

    pub(crate) fn set_verified(&mut self, verified: bool) {
        self.verified = verified;
    }
}

/// Partial update of a field. Absent members are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Operator note kept in the audit trail; never stored on the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FieldPatch {
    /// Patch that only replaces the value.
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Patch that only sets the verification flag.
    pub fn verified(verified: bool) -> Self {
        Self {
            verified: Some(verified),
            ..Self::default()
        }
    }

    pub fn and_verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Trimmed comment, `None` when blank.
    pub fn note(&self) -> Option<String> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }

    /// A comment alone changes nothing.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.verified.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_field_is_unverified_and_uncorrected() {
        let field = Field::new("f1", "合同编号", "HT-2024-001");
        assert!(!field.is_verified());
        assert!(!field.is_corrected());
        assert_eq!(field.original_value(), "HT-2024-001");
        assert_eq!(field.kind(), &FieldKind::Text);
    }

    #[test]
    fn corrected_tracks_original_value() {
        let mut field = Field::new("f1", "金额", "1,000");
        field.set_value("1,200".to_string());
        assert!(field.is_corrected());
        field.set_value("1,000".to_string());
        assert!(!field.is_corrected());
    }

    #[test]
    fn patch_rejects_unknown_keys() {
        let err = serde_json::from_str::<FieldPatch>(r#"{"name":"x"}"#);
        assert!(err.is_err());

        let patch: FieldPatch = serde_json::from_str(r#"{"verified":true}"#).unwrap();
        assert_eq!(patch, FieldPatch::verified(true));

        let patch: FieldPatch =
            serde_json::from_str(r#"{"verified":true,"comment":" 核对原件 "}"#).unwrap();
        assert_eq!(patch.note().as_deref(), Some("核对原件"));
        assert!(FieldPatch::default().with_comment("仅备注").is_empty());
        assert_eq!(FieldPatch::verified(true).with_comment("  ").note(), None);
    }

    #[test]
    fn enum_kind_serializes_with_type_tag() {
        let kind = FieldKind::Enum {
            values: vec!["CNY".to_string(), "USD".to_string()],
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "enum");
        assert_eq!(json["values"][1], "USD");
    }
}
