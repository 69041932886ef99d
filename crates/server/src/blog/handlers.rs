use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::db::{fetch_post_by_id, fetch_post_by_slug, list_posts};
use super::models::{BlogFilter, BlogPost, CreateBlogPostInput, UpdateBlogPostInput};
use super::mutations::{create_post, delete_post, update_post};
use crate::api::{ApiJson, ApiQuery, AppState};
use crate::auth::{AuthUser, MaybeAuthUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/blog", get(list).post(create))
        .route("/blog/slug/{slug}", get(get_by_slug))
        .route("/blog/{id}", get(get_one).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<BlogFilter>,
) -> ApiResult<Json<Paginated<BlogPost>>> {
    let page = params.resolve(&state.config.pagination);
    let (items, total) =
        list_posts(&state.pool, &filter, viewer.visibility(), page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}

fn visible(viewer: &MaybeAuthUser, found: Option<BlogPost>) -> ApiResult<Json<BlogPost>> {
    found
        .filter(|p| viewer.visibility().can_see(p.status))
        .map(Json)
        .ok_or(ApiError::NotFound("blog post"))
}

async fn get_one(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<BlogPost>> {
    visible(&viewer, fetch_post_by_id(&state.pool, &id).await?)
}

async fn get_by_slug(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<BlogPost>> {
    visible(&viewer, fetch_post_by_slug(&state.pool, &slug).await?)
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateBlogPostInput>,
) -> ApiResult<(StatusCode, Json<BlogPost>)> {
    user.require(Role::Editor)?;
    let post = create_post(&state.pool, &user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateBlogPostInput>,
) -> ApiResult<Json<BlogPost>> {
    user.require(Role::Editor)?;
    let post = update_post(&state.pool, &user.actor(), &id, input).await?;
    Ok(Json(post))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Role::Admin)?;
    delete_post(&state.pool, &user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
