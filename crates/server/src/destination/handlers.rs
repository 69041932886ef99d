use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::db::{fetch_destination_by_id, fetch_destination_by_slug, list_destinations};
use super::models::{
    CreateDestinationInput, Destination, DestinationFilter, UpdateDestinationInput,
};
use super::mutations::{create_destination, delete_destination, update_destination};
use crate::api::{ApiJson, ApiQuery, AppState};
use crate::auth::{AuthUser, MaybeAuthUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/destinations", get(list).post(create))
        .route("/destinations/slug/{slug}", get(get_by_slug))
        .route(
            "/destinations/{id}",
            get(get_one).put(update).delete(remove),
        )
}

async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<DestinationFilter>,
) -> ApiResult<Json<Paginated<Destination>>> {
    let page = params.resolve(&state.config.pagination);
    let (items, total) =
        list_destinations(&state.pool, &filter, viewer.visibility(), page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}

fn visible(viewer: &MaybeAuthUser, found: Option<Destination>) -> ApiResult<Json<Destination>> {
    found
        .filter(|d| viewer.visibility().can_see(d.status))
        .map(Json)
        .ok_or(ApiError::NotFound("destination"))
}

async fn get_one(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Destination>> {
    visible(&viewer, fetch_destination_by_id(&state.pool, &id).await?)
}

async fn get_by_slug(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<Destination>> {
    visible(&viewer, fetch_destination_by_slug(&state.pool, &slug).await?)
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateDestinationInput>,
) -> ApiResult<(StatusCode, Json<Destination>)> {
    user.require(Role::Editor)?;
    let destination = create_destination(&state.pool, &user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(destination)))
}

async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateDestinationInput>,
) -> ApiResult<Json<Destination>> {
    user.require(Role::Editor)?;
    let destination = update_destination(&state.pool, &user.actor(), &id, input).await?;
    Ok(Json(destination))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Role::Admin)?;
    delete_destination(&state.pool, &user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
