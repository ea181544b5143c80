//! Query criteria for listing, exporting and summarising records.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::record::{ExtractionRecord, ExtractionStatus};

/// Ephemeral filter; every set predicate must hold.
///
/// Query strings leave parameters blank (`?text=&status=`), so blank values
/// deserialize as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionFilter {
    /// Case-insensitive substring of the document title.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<ExtractionStatus>,
    /// Exact source document id.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub document_id: Option<String>,
    /// Record confidence must be at least this value.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_confidence: Option<f64>,
}

impl ExtractionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_status(mut self, status: ExtractionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }

    pub fn matches(&self, record: &ExtractionRecord) -> bool {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            if !record
                .document_title()
                .to_lowercase()
                .contains(&text.to_lowercase())
            {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status() != status {
                return false;
            }
        }
        if let Some(document_id) = self.document_id.as_deref() {
            if record.document_id() != document_id {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if record.confidence() < min {
                return false;
            }
        }
        true
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
