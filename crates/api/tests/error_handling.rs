//! Tests for `AppError` → HTTP response mapping.
//!
//! These tests verify that each `AppError` variant produces the correct HTTP
//! status code, error code, and message. They do NOT need an HTTP server --
//! they call `IntoResponse` directly on `AppError` values.

use axum::response::IntoResponse;
use http_body_util::BodyExt;
use eduboard_api::error::{internal_message, AppError};
use eduboard_core::error::CoreError;
use eduboard_db::{RepoError, StoreError};

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (axum::http::StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::NotFound maps to 404 with NOT_FOUND code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::not_found("Teacher", "a1b2c3"));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Teacher 'a1b2c3' not found");
}

// ---------------------------------------------------------------------------
// Test: AppError::BadRequest maps to 400 with BAD_REQUEST code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("ordered_ids contains duplicate id 'x'".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "ordered_ids contains duplicate id 'x'");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Conflict maps to 409 with CONFLICT code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conflict_error_returns_409() {
    let err = AppError::Core(CoreError::Conflict("An application from 'a@b.example' for this vacancy already exists".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["error"], "An application from 'a@b.example' for this vacancy already exists");
}

// ---------------------------------------------------------------------------
// Test: AppError::InternalError maps to 500 and sanitizes the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("secret database credentials leaked".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");

    // The response body must NOT contain the original error details.
    let body_text = json.to_string();
    assert!(
        !body_text.contains("secret"),
        "Internal error response must not leak sensitive details"
    );
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Unauthorized maps to 401 with UNAUTHORIZED code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_error_returns_401() {
    let err = AppError::Core(CoreError::Unauthorized("Authentication required".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["error"], "Authentication required");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Validation maps to 400 with VALIDATION_ERROR code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("email is required".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "email is required");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Forbidden maps to 403 with FORBIDDEN code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn forbidden_error_returns_403() {
    let err = AppError::Core(CoreError::Forbidden("Admin access required".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
    assert_eq!(json["error"], "Admin access required");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Internal maps to 500 and sanitizes like InternalError
// ---------------------------------------------------------------------------

#[tokio::test]
async fn core_internal_error_returns_500_and_sanitizes() {
    let err = AppError::Core(CoreError::Internal("panic stack trace here".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");

    let body_text = json.to_string();
    assert!(
        !body_text.contains("panic stack trace"),
        "Core internal error must not leak details"
    );
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: StoreError::Duplicate maps to 409 with CONFLICT code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_duplicate_returns_409() {
    let err: AppError = RepoError::Store(StoreError::Duplicate {
        collection: "teachers",
        field: "email".into(),
    })
    .into();

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(
        json["error"],
        "A record in teachers with this email already exists"
    );
}

// ---------------------------------------------------------------------------
// Test: corrupt rows are internal errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_corrupt_returns_500_and_sanitizes() {
    let err = AppError::Store(StoreError::Corrupt("row 17 body is not an object".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(!json.to_string().contains("row 17"));
}

// ---------------------------------------------------------------------------
// Test: internal detail exposure switch
// ---------------------------------------------------------------------------

#[test]
fn internal_message_respects_exposure_flag() {
    assert_eq!(
        internal_message("connection reset", false),
        "An internal error occurred"
    );
    assert_eq!(internal_message("connection reset", true), "connection reset");
}

// ---------------------------------------------------------------------------
// Test: unmatched routes use the same envelope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn route_not_found_returns_404_envelope() {
    let err = AppError::RouteNotFound("/api/teacher".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "No route for /api/teacher");
}
