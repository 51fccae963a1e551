use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use eduboard_core::error::CoreError;
use eduboard_db::{RepoError, StoreError};

/// Generic message returned for 500 responses.
const INTERNAL_MESSAGE: &str = "An internal error occurred";

static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Set once at startup from `EXPOSE_INTERNAL_ERRORS`.
pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::Relaxed);
}

/// Response message for an internal error: the detail itself when exposure
/// is enabled, otherwise a generic message.
pub fn internal_message(detail: &str, expose: bool) -> String {
    if expose {
        detail.to_string()
    } else {
        INTERNAL_MESSAGE.to_string()
    }
}

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for storage
/// failures, and adds HTTP-specific variants. Implements [`IntoResponse`] to
/// produce consistent `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `eduboard_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage error from `eduboard_db`.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route matches the request path.
    #[error("No route for {0}")]
    RouteNotFound(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Core(e) => AppError::Core(e),
            RepoError::Store(e) => AppError::Store(e),
        }
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{id}' not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal(msg)
                }
            },

            // --- Storage errors ---
            AppError::Store(err) => classify_store_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::RouteNotFound(path) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("No route for {path}"),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal(msg)
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal(detail: &str) -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        internal_message(detail, EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed)),
    )
}

/// Classify a storage error into an HTTP status, error code, and message.
///
/// - Duplicate keys map to 409.
/// - Unique constraint violations that slipped past the store (constraint
///   name starting with `uq_`) map to 409.
/// - Everything else maps to 500.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::Duplicate { collection, field } => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("A record in {collection} with this {field} already exists"),
        ),
        StoreError::Database(db) => classify_sqlx_error(db),
        other => {
            tracing::error!(error = %other, "Storage error");
            internal(&other.to_string())
        }
    }
}

fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    if let sqlx::Error::Database(db_err) = err {
        // PostgreSQL unique constraint violation: error code 23505
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                );
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    internal(&err.to_string())
}
