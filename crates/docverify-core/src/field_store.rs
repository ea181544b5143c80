//! Validated point updates of a single field.
//!
//! The patch is fully validated before anything is written, so a rejected
//! patch leaves the field untouched. Status recomputation belongs to the
//! caller.

use chrono::NaiveDate;
use regex::Regex;

use crate::domain::{
    ExtractionRecord, Field, FieldId, FieldKind, FieldPatch, Result, ValidationError, VerifyError,
};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日"];

/// Applies field patches to a loaded record.
pub struct FieldStore;

impl FieldStore {
    /// Apply `patch` to field `field_id` of `record` and return the updated field.
    pub fn update_field(
        record: &mut ExtractionRecord,
        field_id: &FieldId,
        patch: &FieldPatch,
    ) -> Result<Field> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let extraction_id = record.id().clone();
        let field = record
            .field_mut(field_id)
            .ok_or_else(|| VerifyError::FieldNotFound {
                extraction_id,
                field_id: field_id.clone(),
            })?;

        let value = match &patch.value {
            Some(raw) => Some(normalize(field, raw)?),
            None => None,
        };

        if let Some(value) = value {
            field.set_value(value);
        }
        if let Some(verified) = patch.verified {
            field.set_verified(verified);
        }
        Ok(field.clone())
    }
}

/// Trim, check and canonicalise an operator-supplied value for `field`.
pub fn normalize(field: &Field, raw: &str) -> std::result::Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::EmptyValue {
            field_id: field.id().clone(),
        });
    }

    if let Some(pattern) = field.pattern() {
        let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            ValidationError::InvalidPattern {
                field_id: field.id().clone(),
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;
        if !re.is_match(value) {
            return Err(ValidationError::PatternMismatch {
                field_id: field.id().clone(),
                value: value.to_string(),
                pattern: pattern.to_string(),
            });
        }
    }

    match field.kind() {
        FieldKind::Text => Ok(value.to_string()),
        FieldKind::Date => DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(|| ValidationError::InvalidDate {
                field_id: field.id().clone(),
                value: value.to_string(),
            }),
        FieldKind::Amount => {
            let digits: String = value
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            match digits.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(value.to_string()),
                _ => Err(ValidationError::InvalidAmount {
                    field_id: field.id().clone(),
                    value: value.to_string(),
                }),
            }
        }
        FieldKind::Enum { values } => values
            .iter()
            .find(|allowed| allowed.to_lowercase() == value.to_lowercase())
            .cloned()
            .ok_or_else(|| ValidationError::NotAllowed {
                field_id: field.id().clone(),
                value: value.to_string(),
                allowed: values.clone(),
            }),
    }
}
