use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::users::{fetch_user_by_id, list_users};
use super::{AuthUser, CreateUserInput, Role, User, authenticate, create_user};
use crate::api::{ApiJson, ApiQuery, AppState};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/users", get(list).post(create))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = authenticate(
        &state.pool,
        &request.email,
        &request.password,
        state.config.auth.password_iterations,
    )
    .await?;
    let token = state.jwt.issue(&user)?;

    tracing::info!(user = %user.id, role = user.role.as_str(), "login succeeded");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.jwt.ttl_secs(),
        user,
    }))
}

async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    // The token may outlive the account.
    let record = fetch_user_by_id(&state.pool, &user.0.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("account no longer exists".into()))?;
    Ok(Json(record))
}

async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Paginated<User>>> {
    user.require(Role::Admin)?;
    let page = params.resolve(&state.config.pagination);
    let (items, total) = list_users(&state.pool, page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}

async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateUserInput>,
) -> ApiResult<(StatusCode, Json<User>)> {
    user.require(Role::Admin)?;
    let created = create_user(
        &state.pool,
        &user.actor(),
        input,
        state.config.auth.password_iterations,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
