//! Flat export of review results.
//!
//! One row per field, carrying its parent record's metadata. The snapshot's
//! digest is SHA-256 over the JSON rows, so it does not depend on
//! `generated_at`. CSV follows RFC 4180 quoting with CRLF line endings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::domain::{
    ConfidenceBand, ExtractionRecord, ExtractionStatus, FieldId, Result, ValidationError,
};

pub const EXPORT_SCHEMA_VERSION: &str = "1.0";

const CSV_HEADER: [&str; 15] = [
    "extraction_id",
    "document_id",
    "document_title",
    "status",
    "status_label",
    "confidence",
    "confidence_band",
    "extracted_at",
    "field_id",
    "field_name",
    "value",
    "original_value",
    "verified",
    "corrected",
    "field_confidence",
];

/// Output encoding of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ValidationError::UnknownFormat(other.to_string())),
        }
    }
}

/// One field of one record, carrying its parent record's metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportRow {
    pub extraction_id: String,
    pub document_id: String,
    pub document_title: String,
    pub status: ExtractionStatus,
    pub status_label: String,
    pub confidence: f64,
    pub confidence_band: ConfidenceBand,
    pub extracted_at: DateTime<Utc>,
    pub field_id: FieldId,
    pub field_name: String,
    pub value: String,
    pub original_value: String,
    pub verified: bool,
    pub corrected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_confidence: Option<f64>,
}

/// Flattened, read-only view of a set of records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub record_count: usize,
    pub row_count: usize,
    /// SHA-256 over the JSON encoding of `rows`; equal content, equal digest.
    pub digest: String,
    pub rows: Vec<ExportRow>,
}

/// One row per field, records in the given order, fields in record order.
pub fn flatten<'a, I>(records: I) -> Vec<ExportRow>
where
    I: IntoIterator<Item = &'a ExtractionRecord>,
{
    let mut rows = Vec::new();
    for record in records {
        for field in record.fields() {
            rows.push(ExportRow {
                extraction_id: record.id().to_string(),
                document_id: record.document_id().to_string(),
                document_title: record.document_title().to_string(),
                status: record.status(),
                status_label: record.status().label().to_string(),
                confidence: record.confidence(),
                confidence_band: record.confidence_band(),
                extracted_at: record.extracted_at(),
                field_id: field.id().clone(),
                field_name: field.name().to_string(),
                value: field.value().to_string(),
                original_value: field.original_value().to_string(),
                verified: field.is_verified(),
                corrected: field.is_corrected(),
                field_confidence: field.confidence(),
            });
        }
    }
    rows
}

impl ExportSnapshot {
    pub fn build<'a, I>(records: I, generated_at: DateTime<Utc>) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ExtractionRecord>,
    {
        let records: Vec<&ExtractionRecord> = records.into_iter().collect();
        let rows = flatten(records.iter().copied());
        let digest = hex::encode(Sha256::digest(serde_json::to_vec(&rows)?));
        Ok(Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            generated_at,
            record_count: records.len(),
            row_count: rows.len(),
            digest,
            rows,
        })
    }

    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Csv => Ok(render_csv(&self.rows)),
        }
    }
}

/// Render rows as RFC 4180 CSV with a header line.
pub fn render_csv(rows: &[ExportRow]) -> String {
    let mut out = String::new();
    push_line(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));
    for row in rows {
        push_line(
            &mut out,
            [
                row.extraction_id.clone(),
                row.document_id.clone(),
                row.document_title.clone(),
                row.status.as_str().to_string(),
                row.status_label.clone(),
                row.confidence.to_string(),
                row.confidence_band.as_str().to_string(),
                row.extracted_at.to_rfc3339(),
                row.field_id.to_string(),
                row.field_name.clone(),
                row.value.clone(),
                row.original_value.clone(),
                row.verified.to_string(),
                row.corrected.to_string(),
                row.field_confidence
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            ],
        );
    }
    out
}

fn push_line<I: IntoIterator<Item = String>>(out: &mut String, cells: I) {
    let line: Vec<String> = cells.into_iter().map(|c| csv_escape(&c)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
