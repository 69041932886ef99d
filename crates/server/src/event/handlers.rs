use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::db::{fetch_event_by_id, fetch_event_by_slug, list_events};
use super::models::{CreateEventInput, Event, EventFilter, UpdateEventInput};
use super::mutations::{create_event, delete_event, update_event};
use crate::api::{ApiJson, ApiQuery, AppState};
use crate::auth::{AuthUser, MaybeAuthUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list).post(create))
        .route("/events/slug/{slug}", get(get_by_slug))
        .route("/events/{id}", get(get_one).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<EventFilter>,
) -> ApiResult<Json<Paginated<Event>>> {
    let page = params.resolve(&state.config.pagination);
    let (items, total) =
        list_events(&state.pool, &filter, viewer.visibility(), page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}

fn visible(viewer: &MaybeAuthUser, found: Option<Event>) -> ApiResult<Json<Event>> {
    found
        .filter(|e| viewer.visibility().can_see(e.status))
        .map(Json)
        .ok_or(ApiError::NotFound("event"))
}

async fn get_one(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Event>> {
    visible(&viewer, fetch_event_by_id(&state.pool, &id).await?)
}

async fn get_by_slug(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<Event>> {
    visible(&viewer, fetch_event_by_slug(&state.pool, &slug).await?)
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateEventInput>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    user.require(Role::Editor)?;
    let event = create_event(&state.pool, &user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateEventInput>,
) -> ApiResult<Json<Event>> {
    user.require(Role::Editor)?;
    let event = update_event(&state.pool, &user.actor(), &id, input).await?;
    Ok(Json(event))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Role::Admin)?;
    delete_event(&state.pool, &user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
