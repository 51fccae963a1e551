//! JWT-based authentication extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use eduboard_core::authz::Principal;
use eduboard_core::error::CoreError;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller extracted from a JWT Bearer token in the `Authorization` header.
///
/// Rejects with 401 when the header is missing or the token is invalid.
///
/// ```ignore
/// async fn my_handler(AuthUser(user): AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

/// Caller identity for endpoints that are public but behave differently for
/// signed-in users. A missing header yields `None`; a malformed or invalid
/// token is still rejected with 401.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Principal>);

impl MaybeAuthUser {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

fn principal_from_header(header: &str, state: &AppState) -> Result<Principal, AppError> {
    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })?;

    let claims = validate_token(token, &state.config.jwt).map_err(|_| {
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    })?;

    Ok(claims.into_principal())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        principal_from_header(auth_header, state).map(AuthUser)
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match parts.headers.get(AUTHORIZATION) {
            None => Ok(MaybeAuthUser(None)),
            Some(value) => {
                let header = value.to_str().map_err(|_| {
                    AppError::Core(CoreError::Unauthorized(
                        "Invalid Authorization header".into(),
                    ))
                })?;
                principal_from_header(header, state).map(|p| MaybeAuthUser(Some(p)))
            }
        }
    }
}
