//! Review API router.
//!
//! Every `/extractions` route sits behind the operator-identity middleware.
//! `/health` is open.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7). The static
//! `export` and `stats` segments win over `:id`.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::operator;
use crate::api::AppState;

/// Build the review API router.
pub fn review_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/extractions", get(endpoints::list))
        .route("/extractions/export", get(endpoints::export))
        .route("/extractions/stats", get(endpoints::stats))
        .route("/extractions/:id", get(endpoints::detail))
        .route("/extractions/:id/history", get(endpoints::history))
        .route(
            "/extractions/:id/fields/:field_id",
            patch(endpoints::edit_field),
        )
        .route("/extractions/:id/fail", post(endpoints::mark_failed))
        .route("/extractions/:id/reopen", post(endpoints::reopen))
        .with_state(state.clone())
        .layer(axum::middleware::from_fn(operator::require_operator));

    let open = Router::new()
        .route("/health", get(endpoints::health))
        .with_state(state);

    Router::new().merge(protected).merge(open)
}
