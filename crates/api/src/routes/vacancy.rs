use axum::routing::{get, post, put};
use axum::Router;
use eduboard_db::models::vacancy::Vacancy;

use crate::handlers::{collection, vacancy};
use crate::state::AppState;

/// Vacancy routes mounted at `/api/vacancies`.
///
/// ```text
/// GET    /               -> list_vacancies (public: approved only)
/// POST   /               -> create_vacancy (authenticated; admin posts are approved)
/// PUT    /reorder        -> reorder (admin only)
/// GET    /{id}           -> get_vacancy
/// PUT    /{id}           -> replace (owner or admin; status is kept)
/// PATCH  /{id}           -> patch (owner or admin; status is kept)
/// DELETE /{id}           -> delete (admin only)
/// POST   /{id}/approve   -> approve_vacancy (admin only)
/// POST   /{id}/reject    -> reject_vacancy (admin only)
/// POST   /{id}/close     -> close_vacancy (owner or admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(vacancy::list_vacancies).post(vacancy::create_vacancy),
        )
        .route("/reorder", put(collection::reorder::<Vacancy>))
        .route(
            "/{id}",
            get(vacancy::get_vacancy)
                .put(collection::replace::<Vacancy>)
                .patch(collection::patch::<Vacancy>)
                .delete(collection::delete::<Vacancy>),
        )
        .route("/{id}/approve", post(vacancy::approve_vacancy))
        .route("/{id}/reject", post(vacancy::reject_vacancy))
        .route("/{id}/close", post(vacancy::close_vacancy))
}
