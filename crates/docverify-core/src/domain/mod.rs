//! Domain models for DocVerify.
//!
//! Canonical definitions for the core entities:
//! - `Field`: One extracted value, independently verifiable
//! - `ExtractionRecord`: All fields of one document plus derived status
//! - `ExtractionFilter`: Query criteria
//! - `ConfidenceBand`: Reviewer-facing grouping of engine confidence

pub mod confidence;
pub mod error;
pub mod field;
pub mod filter;
pub mod record;

// Re-export main types and errors
pub use confidence::ConfidenceBand;
pub use error::{Result, ValidationError, VerifyError};
pub use field::{Field, FieldId, FieldKind, FieldPatch};
pub use filter::ExtractionFilter;
pub use record::{
    ExtractionId, ExtractionRecord, ExtractionStatus, NewExtraction, NewField,
};
