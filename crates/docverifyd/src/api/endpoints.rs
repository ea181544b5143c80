//! Extraction review endpoints.
//!
//! - `GET /extractions`: filtered list
//! - `GET /extractions/:id`: one record
//! - `PATCH /extractions/:id/fields/:field_id`: edit one field
//! - `POST /extractions/:id/fail` and `/reopen`: status overrides
//! - `GET /extractions/export`, `/extractions/stats`, `/extractions/:id/history`

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{self, HeaderName};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use docverify_core::{
    ExportFormat, ExtractionFilter, ExtractionId, ExtractionRecord, FieldId, FieldPatch,
    ReviewEvent, ReviewStats,
};

use crate::api::error::ApiError;
use crate::api::operator::Operator;
use crate::api::AppState;

pub const DIGEST_HEADER: &str = "x-export-digest";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub records: usize,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub items: Vec<ExtractionRecord>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(flatten)]
    pub filter: ExtractionFilter,
    pub format: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FailBody {
    #[serde(default)]
    pub reason: Option<String>,
}

fn filter_from(query: Result<Query<ExtractionFilter>, QueryRejection>) -> Result<ExtractionFilter, ApiError> {
    let Query(filter) = query?;
    Ok(filter)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let records = state.service.repository().len()?;
    Ok(Json(HealthResponse {
        status: "ok",
        records,
    }))
}

/// `GET /extractions?text=&status=&document_id=&min_confidence=`
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ExtractionFilter>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError> {
    let filter = filter_from(query)?;
    let items: Vec<ExtractionRecord> = state
        .service
        .list(&filter)?
        .iter()
        .map(|r| ExtractionRecord::clone(r))
        .collect();
    Ok(Json(ListResponse {
        count: items.len(),
        items,
    }))
}

/// `GET /extractions/:id`
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExtractionRecord>, ApiError> {
    let record = state.service.get(&ExtractionId::new(id))?;
    Ok(Json(ExtractionRecord::clone(&record)))
}

/// `PATCH /extractions/:id/fields/:field_id` with body `{value?, verified?}`
pub async fn edit_field(
    State(state): State<AppState>,
    Extension(operator): Extension<Operator>,
    Path((id, field_id)): Path<(String, String)>,
    body: Result<Json<FieldPatch>, JsonRejection>,
) -> Result<Json<ExtractionRecord>, ApiError> {
    let Json(patch) = body?;
    let record = state
        .service
        .edit_field(
            &ExtractionId::new(id),
            &FieldId::new(field_id),
            &patch,
            operator.as_str(),
        )
        .await?;
    Ok(Json(ExtractionRecord::clone(&record)))
}

/// `POST /extractions/:id/fail` with optional body `{reason?}`
pub async fn mark_failed(
    State(state): State<AppState>,
    Extension(operator): Extension<Operator>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ExtractionRecord>, ApiError> {
    let fail: FailBody = if body.iter().all(u8::is_ascii_whitespace) {
        FailBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let record = state
        .service
        .mark_failed(&ExtractionId::new(id), fail.reason, operator.as_str())
        .await?;
    Ok(Json(ExtractionRecord::clone(&record)))
}

/// `POST /extractions/:id/reopen`
pub async fn reopen(
    State(state): State<AppState>,
    Extension(operator): Extension<Operator>,
    Path(id): Path<String>,
) -> Result<Json<ExtractionRecord>, ApiError> {
    let record = state
        .service
        .reopen(&ExtractionId::new(id), operator.as_str())
        .await?;
    Ok(Json(ExtractionRecord::clone(&record)))
}

/// `GET /extractions/export?…&format=json|csv`
pub async fn export(
    State(state): State<AppState>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let format = match query.format.as_deref().map(str::trim) {
        None | Some("") => ExportFormat::Json,
        Some(raw) => raw.parse::<ExportFormat>().map_err(docverify_core::VerifyError::from)?,
    };

    let snapshot = state.service.export(&query.filter)?;
    let digest = snapshot.digest.clone();
    let disposition = format!(
        "attachment; filename=\"extractions-{}.{}\"",
        Utc::now().format("%Y%m%d%H%M%S"),
        format
    );
    let body = snapshot.render(format)?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (HeaderName::from_static(DIGEST_HEADER), digest),
        ],
        body,
    )
        .into_response())
}

/// `GET /extractions/stats?…`
pub async fn stats(
    State(state): State<AppState>,
    query: Result<Query<ExtractionFilter>, QueryRejection>,
) -> Result<Json<ReviewStats>, ApiError> {
    let filter = filter_from(query)?;
    Ok(Json(state.service.stats(&filter)?))
}

/// `GET /extractions/:id/history`
pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReviewEvent>>, ApiError> {
    Ok(Json(state.service.history(&ExtractionId::new(id)).await?))
}
