use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::db::{fetch_tour_by_id, fetch_tour_by_slug, list_tours};
use super::models::{CreateTourInput, Tour, TourFilter, UpdateTourInput};
use super::mutations::{create_tour, delete_tour, update_tour};
use crate::api::{ApiJson, ApiQuery, AppState};
use crate::auth::{AuthUser, MaybeAuthUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tours", get(list).post(create))
        .route("/tours/slug/{slug}", get(get_by_slug))
        .route("/tours/{id}", get(get_one).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<TourFilter>,
) -> ApiResult<Json<Paginated<Tour>>> {
    let page = params.resolve(&state.config.pagination);
    let (items, total) =
        list_tours(&state.pool, &filter, viewer.visibility(), page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}

fn visible(viewer: &MaybeAuthUser, found: Option<Tour>) -> ApiResult<Json<Tour>> {
    found
        .filter(|t| viewer.visibility().can_see(t.status))
        .map(Json)
        .ok_or(ApiError::NotFound("tour"))
}

async fn get_one(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Tour>> {
    visible(&viewer, fetch_tour_by_id(&state.pool, &id).await?)
}

async fn get_by_slug(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<Tour>> {
    visible(&viewer, fetch_tour_by_slug(&state.pool, &slug).await?)
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateTourInput>,
) -> ApiResult<(StatusCode, Json<Tour>)> {
    user.require(Role::Editor)?;
    let tour = create_tour(&state.pool, &user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(tour)))
}

async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateTourInput>,
) -> ApiResult<Json<Tour>> {
    user.require(Role::Editor)?;
    let tour = update_tour(&state.pool, &user.actor(), &id, input).await?;
    Ok(Json(tour))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Role::Admin)?;
    delete_tour(&state.pool, &user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
