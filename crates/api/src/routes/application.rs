use axum::routing::{get, patch};
use axum::Router;
use eduboard_db::models::application::Application;

use crate::handlers::{application, collection};
use crate::state::AppState;

/// Application routes mounted at `/api/applications`.
///
/// ```text
/// GET    /               -> list_applications (mine, or reviewers)
/// POST   /               -> create_application (authenticated)
/// GET    /{id}           -> get_application (applicant or reviewer)
/// PUT    /{id}           -> replace (applicant or admin)
/// PATCH  /{id}           -> patch (applicant or admin)
/// DELETE /{id}           -> delete (admin only)
/// PATCH  /{id}/status    -> update_application_status (reviewer)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(application::list_applications).post(application::create_application),
        )
        .route(
            "/{id}",
            get(application::get_application)
                .put(collection::replace::<Application>)
                .patch(collection::patch::<Application>)
                .delete(collection::delete::<Application>),
        )
        .route(
            "/{id}/status",
            patch(application::update_application_status),
        )
}
