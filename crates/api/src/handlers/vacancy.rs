//! Vacancy handlers.
//!
//! Vacancies go through moderation: a vacancy posted by an admin is approved
//! immediately, anyone else's starts `pending` until an admin approves it.
//! Only approved vacancies are visible to the public. Every transition to
//! `approved` schedules the vacancy announcement on the notification outbox;
//! scheduling failures are logged and never fail the request.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use eduboard_core::authz::{authorize, can_view_private, Access, Principal};
use eduboard_core::error::CoreError;
use eduboard_db::models::vacancy::{Vacancy, VacancyFilter, VacancyStatus};
use eduboard_db::models::{Document, ListFilter, Record};
use eduboard_db::repositories::CollectionRepo;
use eduboard_events::schedule_vacancy_announcement;

use super::collection::{list_key, list_records, present};
use crate::error::AppResult;
use crate::extract::{JsonBody, QueryParams};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::middleware::rbac::RequireAdmin;
use crate::query::ListParams;
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

type Vacancies = CollectionRepo<Vacancy>;

/// GET /api/vacancies
///
/// Public callers only see approved vacancies. Admins, and callers listing
/// their own vacancies with `mine=true`, may filter on any `status`.
pub async fn list_vacancies(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
    QueryParams(mut filter): QueryParams<VacancyFilter>,
) -> AppResult<impl IntoResponse> {
    let principal = auth.principal();
    filter.status = filter
        .status
        .as_deref()
        .map(VacancyStatus::parse)
        .transpose()?
        .map(|status| status.as_str().to_string());

    let privileged = params.mine || principal.is_some_and(Principal::is_admin);
    if !privileged {
        filter.status = Some(VacancyStatus::Approved.as_str().to_string());
    }

    let page = list_records::<Vacancy>(&state, principal, &params, filter.to_spec()).await?;
    let page = page.map(|record| present(record, principal));

    Ok(Json(ListResponse::new(list_key(Vacancy::COLLECTION), page)))
}

/// GET /api/vacancies/{id}
///
/// Vacancies that are not approved are only visible to their owner and admins.
pub async fn get_vacancy(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let principal = auth.principal();
    let record = Vacancies::resolve(state.store(), &key).await?;

    if record.body.status != VacancyStatus::Approved
        && !can_view_private(principal, &record.ownership())
    {
        return Err(CoreError::not_found(Vacancy::COLLECTION.label(), key.trim()).into());
    }

    Ok(Json(DataResponse {
        data: present(record, principal),
    }))
}

/// POST /api/vacancies
///
/// Admin posts are approved (and announced) immediately; everything else
/// waits for moderation.
pub async fn create_vacancy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    JsonBody(mut input): JsonBody<Vacancy>,
) -> AppResult<impl IntoResponse> {
    input.status = if user.is_admin() {
        VacancyStatus::Approved
    } else {
        VacancyStatus::Pending
    };

    let record = Vacancies::create(
        state.store(),
        input,
        Some(&user.user_id),
        state.config.sequence_strategy,
    )
    .await?;

    tracing::info!(
        vacancy_id = %record.id,
        status = record.body.status.as_str(),
        user_id = %user.user_id,
        "Vacancy created",
    );

    if record.body.status == VacancyStatus::Approved {
        announce(&state, &record).await;
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// POST /api/vacancies/{id}/approve
///
/// Admin only. Approving an already approved vacancy is a no-op and does not
/// announce it again.
pub async fn approve_vacancy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<DataResponse<Record<Vacancy>>>> {
    let existing = Vacancies::resolve(state.store(), &key).await?;
    if existing.body.status == VacancyStatus::Approved {
        return Ok(Json(DataResponse { data: existing }));
    }

    let record = transition(&state, &existing, VacancyStatus::Approved, &admin).await?;
    announce(&state, &record).await;

    Ok(Json(DataResponse { data: record }))
}

/// POST /api/vacancies/{id}/reject
///
/// Admin only.
pub async fn reject_vacancy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<DataResponse<Record<Vacancy>>>> {
    let existing = Vacancies::resolve(state.store(), &key).await?;
    let record = transition(&state, &existing, VacancyStatus::Rejected, &admin).await?;

    Ok(Json(DataResponse { data: record }))
}

/// POST /api/vacancies/{id}/close
///
/// Stop accepting applications. Owner or admin.
pub async fn close_vacancy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<DataResponse<Record<Vacancy>>>> {
    let existing = Vacancies::resolve(state.store(), &key).await?;
    authorize(Some(&user), Access::OwnerOrAdmin(existing.ownership()))?;
    let record = transition(&state, &existing, VacancyStatus::Closed, &user).await?;

    Ok(Json(DataResponse { data: record }))
}

async fn transition(
    state: &AppState,
    existing: &Record<Vacancy>,
    status: VacancyStatus,
    actor: &Principal,
) -> AppResult<Record<Vacancy>> {
    let mut body = existing.body.clone();
    body.status = status;
    let record = Vacancies::update_managed(state.store(), existing, body).await?;

    tracing::info!(
        vacancy_id = %record.id,
        from = existing.body.status.as_str(),
        to = status.as_str(),
        user_id = %actor.user_id,
        "Vacancy status changed",
    );
    Ok(record)
}

/// Enqueue the announcement and wake the dispatcher.
async fn announce(state: &AppState, vacancy: &Record<Vacancy>) {
    match schedule_vacancy_announcement(
        state.outbox.as_ref(),
        vacancy,
        state.config.notify.max_attempts,
    )
    .await
    {
        Ok(message) => {
            tracing::info!(
                vacancy_id = %vacancy.id,
                message_id = message.id,
                "Vacancy announcement scheduled",
            );
            state.notify_outbox();
        }
        Err(e) => {
            tracing::error!(
                vacancy_id = %vacancy.id,
                error = %e,
                "Failed to schedule vacancy announcement",
            );
        }
    }
}
