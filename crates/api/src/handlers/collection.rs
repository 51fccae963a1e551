//! Generic handlers for document collections.
//!
//! Every entity gets the same list / get / create / replace / patch / delete
//! / reorder endpoints, parameterised by its [`Document`] type. Reads are
//! public with private fields redacted; writes go through the authorization
//! gate.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use eduboard_core::authz::{authorize, can_view_private, Access, Principal};
use eduboard_core::filter::{FilterSpec, SortSpec};
use eduboard_core::pagination::Page;
use eduboard_core::types::ObjectId;
use eduboard_db::models::{Document, ListFilter, Record};
use eduboard_db::repositories::CollectionRepo;
use eduboard_db::Collection;

use crate::error::AppResult;
use crate::extract::{JsonBody, QueryParams};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::middleware::rbac::RequireAdmin;
use crate::query::{ListParams, ReorderRequest};
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

/// Key of the item array in list responses.
pub fn list_key(collection: Collection) -> &'static str {
    match collection {
        Collection::Teachers => "teachers",
        Collection::NonTeachers => "non_teachers",
        Collection::Coaching => "coaching",
        Collection::Schools => "schools",
        Collection::Vacancies => "vacancies",
        Collection::Applications => "applications",
        Collection::ParentProfiles => "parents",
        Collection::StudentProfiles => "students",
        Collection::HomeTuitions => "home_tuitions",
    }
}

/// Redact private fields unless `principal` owns the record or is an admin.
pub fn present<T: Document>(record: Record<T>, principal: Option<&Principal>) -> Record<T> {
    if can_view_private(principal, &record.ownership()) {
        record
    } else {
        record.redacted()
    }
}

/// Run a listing: applies `mine`, sort and paging on top of `spec`.
///
/// `mine=true` from an anonymous caller is a 401.
pub async fn list_records<T: Document>(
    state: &AppState,
    principal: Option<&Principal>,
    params: &ListParams,
    mut spec: FilterSpec,
) -> AppResult<Page<Record<T>>> {
    if params.mine {
        let caller = authorize(principal, Access::Authenticated)?;
        spec = spec.owned_by(&caller.user_id);
    }
    let sort = SortSpec::parse_or(params.sort.as_deref(), T::DEFAULT_SORT)?;

    let page =
        CollectionRepo::<T>::list(state.store(), &spec, sort, params.page_request()).await?;
    Ok(page)
}

/// One `(id, sequence)` pair written by a reorder.
#[derive(Debug, Serialize)]
pub struct SequenceAssignment {
    pub id: ObjectId,
    pub sequence: i64,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/{entity}
///
/// Paginated, filtered listing. Supports `page`, `limit`, `sort`, `mine`
/// plus the entity's filter parameters.
pub async fn list<T: Document>(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
    QueryParams(filter): QueryParams<T::Filter>,
) -> AppResult<impl IntoResponse> {
    let principal = auth.principal();
    let page = list_records::<T>(&state, principal, &params, filter.to_spec()).await?;
    let page = page.map(|record| present(record, principal));

    Ok(Json(ListResponse::new(list_key(T::COLLECTION), page)))
}

/// GET /api/{entity}/{id}
///
/// `id` may be a canonical id, a 6-character short id or a slug.
pub async fn get<T: Document>(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = CollectionRepo::<T>::resolve(state.store(), &key).await?;

    Ok(Json(DataResponse {
        data: present(record, auth.principal()),
    }))
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// POST /api/{entity}
///
/// Any authenticated caller may create; the caller becomes the owner.
pub async fn create<T: Document>(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<T>,
) -> AppResult<impl IntoResponse> {
    let record = CollectionRepo::<T>::create(
        state.store(),
        input,
        Some(&user.user_id),
        state.config.sequence_strategy,
    )
    .await?;

    tracing::info!(
        collection = T::COLLECTION.table(),
        id = %record.id,
        user_id = %user.user_id,
        "Record created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// PUT /api/{entity}/{id}
///
/// Replace the body. Owner or admin.
pub async fn replace<T: Document>(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    JsonBody(input): JsonBody<T>,
) -> AppResult<impl IntoResponse> {
    let existing = CollectionRepo::<T>::resolve(state.store(), &key).await?;
    authorize(Some(&user), Access::OwnerOrAdmin(existing.ownership()))?;

    let record = CollectionRepo::<T>::replace(state.store(), &existing, input).await?;

    tracing::info!(
        collection = T::COLLECTION.table(),
        id = %record.id,
        user_id = %user.user_id,
        "Record replaced",
    );

    Ok(Json(DataResponse { data: record }))
}

/// PATCH /api/{entity}/{id}
///
/// Merge top-level keys into the body; `null` removes a key. Owner or admin.
pub async fn patch<T: Document>(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    JsonBody(changes): JsonBody<Value>,
) -> AppResult<impl IntoResponse> {
    let existing = CollectionRepo::<T>::resolve(state.store(), &key).await?;
    authorize(Some(&user), Access::OwnerOrAdmin(existing.ownership()))?;

    let record = CollectionRepo::<T>::patch(state.store(), &existing, &changes).await?;

    tracing::info!(
        collection = T::COLLECTION.table(),
        id = %record.id,
        user_id = %user.user_id,
        "Record patched",
    );

    Ok(Json(DataResponse { data: record }))
}

/// DELETE /api/{entity}/{id}
///
/// Soft delete. Admin only.
pub async fn delete<T: Document>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    let existing = CollectionRepo::<T>::resolve(state.store(), &key).await?;
    CollectionRepo::<T>::delete(state.store(), &existing.id).await?;

    tracing::info!(
        collection = T::COLLECTION.table(),
        id = %existing.id,
        user_id = %admin.user_id,
        "Record deleted",
    );

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/{entity}/reorder
///
/// Reassign display sequences so that listing by sequence follows
/// `ordered_ids`. Admin only.
pub async fn reorder<T: Document>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ReorderRequest>,
) -> AppResult<impl IntoResponse> {
    let plan = CollectionRepo::<T>::reorder(
        state.store(),
        &input.ordered_ids,
        state.config.sequence_strategy,
    )
    .await?;

    tracing::info!(
        collection = T::COLLECTION.table(),
        count = plan.len(),
        user_id = %admin.user_id,
        "Records reordered",
    );

    let data: Vec<SequenceAssignment> = plan
        .into_iter()
        .map(|(id, sequence)| SequenceAssignment { id, sequence })
        .collect();
    Ok(Json(DataResponse { data }))
}
