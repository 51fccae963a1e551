//! Job application handlers.
//!
//! Applicants own their applications. Reviewing (listing a vacancy's
//! applicants, changing an application's status) is open to admins, the
//! allow-listed reviewer roles and the owner of the vacancy.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use eduboard_core::authz::{authorize, Access, Principal};
use eduboard_core::error::CoreError;
use eduboard_core::filter::FilterSpec;
use eduboard_core::roles::APPLICANT_REVIEWER_ROLES;
use eduboard_db::models::application::{
    Application, ApplicationFilter, ApplicationStatus, UpdateApplicationStatus,
};
use eduboard_db::models::vacancy::{Vacancy, VacancyStatus};
use eduboard_db::models::{Document, ListFilter, Record};
use eduboard_db::repositories::CollectionRepo;

use super::collection::{list_key, list_records};
use crate::error::AppResult;
use crate::extract::{JsonBody, QueryParams};
use crate::middleware::auth::AuthUser;
use crate::query::ListParams;
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

type Applications = CollectionRepo<Application>;
type Vacancies = CollectionRepo<Vacancy>;

/// 403 unless `user` may review applicants of `vacancy`. A vacancy that no
/// longer exists leaves only the reviewer roles.
fn authorize_reviewer(user: &Principal, vacancy: Option<&Record<Vacancy>>) -> AppResult<()> {
    match vacancy {
        Some(vacancy) => authorize(
            Some(user),
            Access::OwnerOrRoles(vacancy.ownership(), APPLICANT_REVIEWER_ROLES),
        )?,
        None => authorize(Some(user), Access::AnyRole(APPLICANT_REVIEWER_ROLES))?,
    };
    Ok(())
}

/// GET /api/applications
///
/// - `mine=true`: the caller's own applications.
/// - `vacancy_id=...`: applicants of one vacancy (admin, hr or vacancy owner).
/// - otherwise: all applications (admin or hr).
pub async fn list_applications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
    QueryParams(mut filter): QueryParams<ApplicationFilter>,
) -> AppResult<impl IntoResponse> {
    filter.status = filter
        .status
        .as_deref()
        .map(ApplicationStatus::parse)
        .transpose()?
        .map(|status| status.as_str().to_string());

    if let Some(key) = filter.vacancy_id.as_deref() {
        let vacancy = Vacancies::resolve(state.store(), key).await?;
        if !params.mine {
            authorize_reviewer(&user, Some(&vacancy))?;
        }
        filter.vacancy_id = Some(vacancy.id.to_string());
    } else if !params.mine {
        authorize_reviewer(&user, None)?;
    }

    let page = list_records::<Application>(&state, Some(&user), &params, filter.to_spec()).await?;

    Ok(Json(ListResponse::new(list_key(Application::COLLECTION), page)))
}

/// GET /api/applications/{id}
///
/// The applicant, or a reviewer of the vacancy.
pub async fn get_application(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let application = Applications::resolve(state.store(), &key).await?;

    if !Access::OwnerOrAdmin(application.ownership()).permits(&user) {
        let vacancy = Vacancies::find(state.store(), &application.body.vacancy_id).await?;
        authorize_reviewer(&user, vacancy.as_ref())?;
    }

    Ok(Json(DataResponse { data: application }))
}

/// POST /api/applications
///
/// Apply to an approved vacancy. `vacancy_id` may be any public identifier
/// of the vacancy and is stored in canonical form. One application per
/// email and vacancy.
pub async fn create_application(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    JsonBody(mut input): JsonBody<Application>,
) -> AppResult<impl IntoResponse> {
    if input.vacancy_id.trim().is_empty() {
        return Err(CoreError::Validation("vacancy_id: must not be empty".into()).into());
    }

    let vacancy = Vacancies::resolve(state.store(), &input.vacancy_id).await?;
    if vacancy.body.status != VacancyStatus::Approved {
        return Err(CoreError::Validation(format!(
            "Vacancy '{}' is not accepting applications",
            vacancy.id
        ))
        .into());
    }

    input.vacancy_id = vacancy.id.to_string();
    input.status = ApplicationStatus::Submitted;

    let duplicate = FilterSpec::new()
        .equals("vacancy_id", Some(vacancy.id.as_str()))
        .equals_ignore_case("email", Some(input.email.trim()));
    if state
        .store()
        .count(Application::COLLECTION, &duplicate)
        .await?
        > 0
    {
        return Err(CoreError::Conflict(format!(
            "An application from '{}' for this vacancy already exists",
            input.email.trim()
        ))
        .into());
    }

    let record = Applications::create(
        state.store(),
        input,
        Some(&user.user_id),
        state.config.sequence_strategy,
    )
    .await?;

    tracing::info!(
        application_id = %record.id,
        vacancy_id = %vacancy.id,
        user_id = %user.user_id,
        "Application submitted",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// PATCH /api/applications/{id}/status
///
/// Admin, hr, or the vacancy owner.
pub async fn update_application_status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    JsonBody(input): JsonBody<UpdateApplicationStatus>,
) -> AppResult<impl IntoResponse> {
    let existing = Applications::resolve(state.store(), &key).await?;
    let vacancy = Vacancies::find(state.store(), &existing.body.vacancy_id).await?;
    authorize_reviewer(&user, vacancy.as_ref())?;

    let mut body = existing.body.clone();
    body.status = input.status;
    let record = Applications::update_managed(state.store(), &existing, body).await?;

    tracing::info!(
        application_id = %record.id,
        from = existing.body.status.as_str(),
        to = record.body.status.as_str(),
        user_id = %user.user_id,
        "Application status changed",
    );

    Ok(Json(DataResponse { data: record }))
}
