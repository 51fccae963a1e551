use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Admin routes mounted at `/api/admin`. All require the `admin` role.
///
/// ```text
/// GET    /outbox              -> list_outbox (?status, page, limit)
/// POST   /outbox/{id}/retry   -> retry_outbox_message
/// GET    /counters            -> list_counters
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/outbox", get(admin::list_outbox))
        .route("/outbox/{id}/retry", post(admin::retry_outbox_message))
        .route("/counters", get(admin::list_counters))
}
