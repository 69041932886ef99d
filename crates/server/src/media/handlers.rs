use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::db::{fetch_media_by_id, list_media};
use super::models::{Media, MediaFilter, UpdateMediaInput, Upload};
use super::mutations::{delete_media, update_media, upload_media};
use super::storage::{clean_original_name, normalize_mime};
use crate::api::{ApiJson, ApiQuery, AppState};
use crate::auth::{AuthUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/media", get(list).post(upload))
        .route("/media/{id}", get(get_one).patch(update).delete(remove))
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// Pull the `file` and optional `altText` fields out of the form.
async fn read_upload(mut multipart: Multipart, limit: usize) -> ApiResult<Upload> {
    let mut file = None;
    let mut alt_text = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let original_name = clean_original_name(field.file_name());
                let mime_type = normalize_mime(field.content_type());
                let bytes = field.bytes().await.map_err(|err| multipart_error(err, limit))?;
                file = Some((original_name, mime_type, bytes));
            }
            Some("altText") => {
                alt_text = Some(field.text().await.map_err(|err| multipart_error(err, limit))?);
            }
            _ => {}
        }
    }

    let (original_name, mime_type, bytes) =
        file.ok_or_else(|| ApiError::bad_request("multipart field 'file' is required"))?;
    Ok(Upload {
        original_name,
        mime_type,
        bytes,
        alt_text,
    })
}

async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Media>)> {
    user.require(Role::Editor)?;
    let upload = read_upload(multipart?, state.media.max_bytes()).await?;
    let media = upload_media(&state.pool, &state.media, &user.actor(), upload).await?;
    Ok((StatusCode::CREATED, Json(media)))
}

async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<MediaFilter>,
) -> ApiResult<Json<Paginated<Media>>> {
    user.require(Role::Editor)?;
    let page = params.resolve(&state.config.pagination);
    let (items, total) = list_media(&state.pool, &filter, page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}

async fn get_one(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Media>> {
    user.require(Role::Editor)?;
    fetch_media_by_id(&state.pool, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("media"))
}

async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateMediaInput>,
) -> ApiResult<Json<Media>> {
    user.require(Role::Editor)?;
    let media = update_media(&state.pool, &user.actor(), &id, input).await?;
    Ok(Json(media))
}

async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Role::Admin)?;
    delete_media(&state.pool, &state.media, &user.actor(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
