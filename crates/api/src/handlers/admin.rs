//! Admin-only operational endpoints: notification outbox inspection and
//! manual retry, and the sequence counters.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use eduboard_core::error::CoreError;
use eduboard_core::pagination::{Page, PageRequest, Pagination};
use eduboard_core::types::DbId;
use eduboard_db::models::outbox::OutboxStatus;

use crate::error::AppResult;
use crate::extract::{PathParam, QueryParams};
use crate::middleware::rbac::RequireAdmin;
use crate::query::OutboxListParams;
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

/// GET /api/admin/outbox
///
/// Outbox messages, newest first, optionally filtered by `status`.
pub async fn list_outbox(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<OutboxListParams>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(OutboxStatus::parse)
        .transpose()?;
    let request = PageRequest::new(params.page, params.limit);

    let (total, items) = tokio::try_join!(
        state.outbox.count_messages(status),
        state
            .outbox
            .list_messages(status, request.skip(), request.limit),
    )?;

    Ok(Json(ListResponse::new(
        "messages",
        Page {
            items,
            pagination: Pagination::new(total, request),
        },
    )))
}

/// POST /api/admin/outbox/{id}/retry
///
/// Requeue a dead message with a fresh attempt budget.
pub async fn retry_outbox_message(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    PathParam(id): PathParam<DbId>,
) -> AppResult<impl IntoResponse> {
    if !state.outbox.requeue(id).await? {
        return Err(match state.outbox.find_message(id).await? {
            None => CoreError::not_found("OutboxMessage", id),
            Some(message) => CoreError::Conflict(format!(
                "Only dead messages can be retried; message {id} is {}",
                message.status
            )),
        }
        .into());
    }
    state.notify_outbox();

    let message = state
        .outbox
        .find_message(id)
        .await?
        .ok_or_else(|| CoreError::not_found("OutboxMessage", id))?;

    tracing::info!(id, user_id = %admin.user_id, "Outbox message requeued");

    Ok(Json(DataResponse { data: message }))
}

/// GET /api/admin/counters
///
/// Current value of every sequence counter.
pub async fn list_counters(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let counters = state.store().counters().await?;

    Ok(Json(DataResponse { data: counters }))
}
