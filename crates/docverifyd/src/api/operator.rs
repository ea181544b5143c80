//! Operator identity middleware.
//!
//! Sessions are validated by the upstream gateway, which forwards the
//! authenticated operator in `X-Operator-Id`. Requests without it are
//! rejected; the identity becomes the audit actor.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;

pub const OPERATOR_HEADER: &str = "X-Operator-Id";

/// Authenticated operator, injected into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator(pub String);

impl Operator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Require a non-empty `X-Operator-Id` header.
pub async fn require_operator(mut req: Request, next: Next) -> Response {
    let operator = req
        .headers()
        .get(OPERATOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    match operator {
        Some(id) => {
            req.extensions_mut().insert(Operator(id));
            next.run(req).await
        }
        None => ApiError::Unauthorized.into_response(),
    }
}
