//! Error types for docverify-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by [`crate::ExtractionStore`] implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No stored extraction with this id
    #[error("extraction not found in store: {extraction_id}")]
    NotFound { extraction_id: String },

    /// An extraction with this id was already handed off
    #[error("extraction already stored: {extraction_id}")]
    AlreadyExists { extraction_id: String },

    /// Backend rejected or failed the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Backend temporarily unreachable
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Payload could not be encoded or decoded
    #[error("storage serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Connection(msg) => StorageError::Unavailable(msg),
            StateError::Serialization(msg) => StorageError::Serialization(msg),
            other => StorageError::Backend(other.to_string()),
        }
    }
}
