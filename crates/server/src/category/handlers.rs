use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::db::{fetch_category_by_id, fetch_category_by_slug, list_categories};
use super::models::{Category, CategoryFilter, CreateCategoryInput, UpdateCategoryInput};
use super::mutations::{create_category, delete_category, update_category};
use crate::api::{ApiJson, ApiQuery, AppState};
use crate::auth::{AuthUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/slug/{slug}", get(get_by_slug))
        .route("/categories/{id}", get(get_one).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<CategoryFilter>,
) -> ApiResult<Json<Paginated<Category>>> {
    let page = params.resolve(&state.config.pagination);
    let (items, total) = list_categories(&state.pool, &filter, page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    fetch_category_by_id(&state.pool, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("category"))
}

async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Category>> {
    fetch_category_by_slug(&state.pool, &slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("category"))
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateCategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    user.require(Role::Editor)?;
    let category = create_category(&state.pool, &user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateCategoryInput>,
) -> ApiResult<Json<Category>> {
    user.require(Role::Editor)?;
    let category = update_category(&state.pool, &user.actor(), &id, input).await?;
    Ok(Json(category))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Role::Admin)?;
    delete_category(&state.pool, &user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
