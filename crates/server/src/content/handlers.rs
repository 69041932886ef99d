use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::db::{fetch_active, fetch_version, list_versions};
use super::models::{ContentKind, ContentVersion, CreateContentInput, UpdateContentInput};
use super::mutations::{activate_version, create_version, delete_version, update_version};
use crate::api::{ApiJson, ApiQuery, AppState};
use crate::auth::{AuthUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/content/{kind}", get(list).post(create))
        .route("/content/{kind}/active", get(active))
        .route(
            "/content/{kind}/{id}",
            get(get_one).put(update).delete(remove),
        )
        .route("/content/{kind}/{id}/activate", post(activate))
}

async fn active(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<ContentVersion>> {
    let kind = ContentKind::from_segment(&kind)?;
    fetch_active(&state.pool, kind)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("active content"))
}

async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Paginated<ContentVersion>>> {
    user.require(Role::Editor)?;
    let kind = ContentKind::from_segment(&kind)?;
    let page = params.resolve(&state.config.pagination);
    let (items, total) = list_versions(&state.pool, kind, page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}

async fn get_one(
    State(state): State<AppState>,
    user: AuthUser,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Json<ContentVersion>> {
    user.require(Role::Editor)?;
    let kind = ContentKind::from_segment(&kind)?;
    fetch_version(&state.pool, kind, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("content version"))
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<String>,
    ApiJson(input): ApiJson<CreateContentInput>,
) -> ApiResult<(StatusCode, Json<ContentVersion>)> {
    user.require(Role::Editor)?;
    let kind = ContentKind::from_segment(&kind)?;
    let version = create_version(&state.pool, &user.actor(), kind, input).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path((kind, id)): Path<(String, String)>,
    ApiJson(input): ApiJson<UpdateContentInput>,
) -> ApiResult<Json<ContentVersion>> {
    user.require(Role::Editor)?;
    let kind = ContentKind::from_segment(&kind)?;
    let version = update_version(&state.pool, &user.actor(), kind, &id, input).await?;
    Ok(Json(version))
}

async fn activate(
    State(state): State<AppState>,
    user: AuthUser,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Json<ContentVersion>> {
    user.require(Role::Editor)?;
    let kind = ContentKind::from_segment(&kind)?;
    let version = activate_version(&state.pool, &user.actor(), kind, &id).await?;
    Ok(Json(version))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    user.require(Role::Admin)?;
    let kind = ContentKind::from_segment(&kind)?;
    delete_version(&state.pool, &user.actor(), kind, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
