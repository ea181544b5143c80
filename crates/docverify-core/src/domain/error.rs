//! Domain-level error taxonomy for DocVerify.

use docverify_state::StorageError;

use super::field::FieldId;
use super::record::ExtractionId;

/// Errors produced by input validation (patches, imports, query parameters).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("value for field {field_id} must not be empty")]
    EmptyValue { field_id: FieldId },

    #[error("patch must set at least one of value or verified")]
    EmptyPatch,

    #[error("field {field_id}: {value:?} is not a valid date (expected YYYY-MM-DD, YYYY/MM/DD or YYYY年MM月DD日)")]
    InvalidDate { field_id: FieldId, value: String },

    #[error("field {field_id}: {value:?} is not a valid amount")]
    InvalidAmount { field_id: FieldId, value: String },

    #[error("field {field_id}: {value:?} is not one of {allowed:?}")]
    NotAllowed {
        field_id: FieldId,
        value: String,
        allowed: Vec<String>,
    },

    #[error("field {field_id}: {value:?} does not match pattern {pattern}")]
    PatternMismatch {
        field_id: FieldId,
        value: String,
        pattern: String,
    },

    #[error("field {field_id}: invalid pattern {pattern}: {reason}")]
    InvalidPattern {
        field_id: FieldId,
        pattern: String,
        reason: String,
    },

    #[error("{attribute} must not be empty")]
    MissingAttribute { attribute: &'static str },

    #[error("confidence {value} is outside [0, 1]")]
    ConfidenceOutOfRange { value: f64 },

    #[error("extraction must contain at least one field")]
    NoFields,

    #[error("duplicate field id: {0}")]
    DuplicateField(FieldId),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("unknown export format: {0}")]
    UnknownFormat(String),
}

/// DocVerify domain errors.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("extraction not found: {0}")]
    ExtractionNotFound(ExtractionId),

    #[error("field {field_id} not found in extraction {extraction_id}")]
    FieldNotFound {
        extraction_id: ExtractionId,
        field_id: FieldId,
    },

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("extraction {extraction_id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        extraction_id: ExtractionId,
        expected: u64,
        actual: u64,
    },

    #[error("extraction already exists: {0}")]
    AlreadyExists(ExtractionId),

    #[error("failed to persist extraction {extraction_id} after {attempts} attempt(s): {reason}")]
    Persistence {
        extraction_id: ExtractionId,
        attempts: u32,
        retryable: bool,
        reason: String,
    },

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VerifyError {
    /// Stable machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            VerifyError::ExtractionNotFound(_) => "extraction_not_found",
            VerifyError::FieldNotFound { .. } => "field_not_found",
            VerifyError::Validation(_) => "validation_failed",
            VerifyError::Conflict { .. } => "conflict",
            VerifyError::AlreadyExists(_) => "already_exists",
            VerifyError::Persistence { .. } => "persistence_failed",
            VerifyError::LockPoisoned(_) => "lock_poisoned",
            VerifyError::Storage(_) => "storage_error",
            VerifyError::Serialization(_) => "serialization_error",
        }
    }

    /// Whether re-issuing the same call may succeed.
    ///
    /// Caller errors (not found, validation, conflict) are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VerifyError::Persistence { retryable: true, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VerifyError::ExtractionNotFound(_) | VerifyError::FieldNotFound { .. }
        )
    }
}

impl From<StorageError> for VerifyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { extraction_id } => {
                VerifyError::ExtractionNotFound(ExtractionId::new(extraction_id))
            }
            StorageError::AlreadyExists { extraction_id } => {
                VerifyError::AlreadyExists(ExtractionId::new(extraction_id))
            }
            other => VerifyError::Storage(other.to_string()),
        }
    }
}

/// Result type for DocVerify domain operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
