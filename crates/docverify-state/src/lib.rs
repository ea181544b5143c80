//! DocVerify-State: SurrealDB Backend for extraction review
//!
//! This crate provides the durable side of the extraction repository. It
//! handles all I/O with SurrealDB and knows nothing about verification rules;
//! records arrive as versioned JSON payloads with a few indexed columns.
//!
//! ## Layer 0 - Data/Persistence
//!
//! ## Key Components
//!
//! - `ExtractionStore`: storage contract (insert / versioned put / history)
//! - `SurrealExtractionStore`: SurrealDB implementation
//! - `fakes::MemoryExtractionStore`: in-memory implementation with failure injection
//! - `SurrealHandle` / `DbConfig`: connection setup

mod error;
pub mod fakes;
mod handle;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use handle::{DbConfig, SurrealHandle};
pub use storage_traits::{
    ExtractionStore, PutOutcome, StorageResult, StoredExtraction, StoredReviewEvent,
};
pub use surreal_store::SurrealExtractionStore;

/// Result type for connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
