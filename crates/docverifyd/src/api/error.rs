//! API error types with structured JSON responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use docverify_core::VerifyError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Operator identity required")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String, bool) {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "operator_required",
                "X-Operator-Id header is required".to_string(),
                false,
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                detail.clone(),
                false,
            ),
            ApiError::Verify(err) => {
                let status = match err {
                    VerifyError::ExtractionNotFound(_) | VerifyError::FieldNotFound { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    VerifyError::Validation(_) => StatusCode::BAD_REQUEST,
                    VerifyError::Conflict { .. } | VerifyError::AlreadyExists(_) => {
                        StatusCode::CONFLICT
                    }
                    VerifyError::Persistence { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    VerifyError::LockPoisoned(_)
                    | VerifyError::Storage(_)
                    | VerifyError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "API internal error");
                    "An internal error occurred".to_string()
                } else {
                    err.to_string()
                };
                (status, err.code(), message, err.is_retryable())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, retryable) = self.parts();
        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                retryable,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docverify_core::{ExtractionId, FieldId, ValidationError};

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (
                ApiError::from(VerifyError::ExtractionNotFound(ExtractionId::new("x"))),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(VerifyError::FieldNotFound {
                    extraction_id: ExtractionId::new("x"),
                    field_id: FieldId::new("f"),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(VerifyError::Validation(ValidationError::EmptyPatch)),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(VerifyError::Conflict {
                    extraction_id: ExtractionId::new("x"),
                    expected: 1,
                    actual: 2,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(VerifyError::Persistence {
                    extraction_id: ExtractionId::new("x"),
                    attempts: 3,
                    retryable: true,
                    reason: "down".to_string(),
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn internal_errors_hide_detail() {
        let (status, code, message, retryable) =
            ApiError::from(VerifyError::Storage("db password wrong".to_string())).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "storage_error");
        assert!(!message.contains("password"));
        assert!(!retryable);
    }
}
