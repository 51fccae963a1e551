//! Routes shared by every document collection.

use axum::routing::{get, put};
use axum::Router;
use eduboard_db::models::Document;

use crate::handlers::collection;
use crate::state::AppState;

/// Standard collection routes for entity `T`, mounted at `/api/{entity}`.
///
/// ```text
/// GET    /            -> list (public, private fields redacted)
/// POST   /            -> create (authenticated)
/// PUT    /reorder     -> reorder (admin only)
/// GET    /{id}        -> get by id, short id or slug (public)
/// PUT    /{id}        -> replace (owner or admin)
/// PATCH  /{id}        -> merge patch (owner or admin)
/// DELETE /{id}        -> soft delete (admin only)
/// ```
pub fn router<T: Document>() -> Router<AppState> {
    Router::new()
        .route("/", get(collection::list::<T>).post(collection::create::<T>))
        .route("/reorder", put(collection::reorder::<T>))
        .route(
            "/{id}",
            get(collection::get::<T>)
                .put(collection::replace::<T>)
                .patch(collection::patch::<T>)
                .delete(collection::delete::<T>),
        )
}
