//! HTTP/JSON surface of the review service.

pub mod endpoints;
pub mod error;
pub mod operator;
pub mod router;

use std::sync::Arc;

use docverify_core::VerificationService;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VerificationService>,
}

impl AppState {
    pub fn new(service: Arc<VerificationService>) -> Self {
        Self { service }
    }
}

pub use router::review_router;
