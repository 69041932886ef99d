use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::db::list_audit_logs;
use super::models::{AuditFilter, AuditLog};
use crate::api::{ApiQuery, AppState};
use crate::auth::{AuthUser, Role};
use crate::error::ApiResult;
use crate::pagination::{PageParams, Paginated};

pub fn routes() -> Router<AppState> {
    Router::new().route("/audit-logs", get(list))
}

async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<AuditFilter>,
) -> ApiResult<Json<Paginated<AuditLog>>> {
    user.require(Role::Admin)?;

    let page = params.resolve(&state.config.pagination);
    let (items, total) = list_audit_logs(&state.pool, &filter, page).await?;
    Ok(Json(Paginated::new(items, page, total)))
}
