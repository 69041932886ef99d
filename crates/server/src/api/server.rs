use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::AppState;
use crate::metrics_exporter::render_metrics;
use crate::{audit, auth, blog, category, content, destination, event, media, tour};

/// Multipart framing overhead allowed on top of the configured file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics(),
    )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

pub fn build_api_router(state: AppState) -> Router {
    let upload_limit = state.config.uploads.max_bytes + MULTIPART_OVERHEAD;

    let api = Router::new()
        .merge(auth::handlers::routes())
        .merge(audit::handlers::routes())
        .merge(category::handlers::routes())
        .merge(destination::handlers::routes())
        .merge(tour::handlers::routes())
        .merge(blog::handlers::routes())
        .merge(event::handlers::routes())
        .merge(content::handlers::routes())
        .merge(media::handlers::routes().layer(DefaultBodyLimit::max(upload_limit)));

    let uploads = ServeDir::new(state.media.root());

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api", api)
        .nest_service(&state.config.uploads.public_path, uploads)
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api(state: AppState, shutdown: CancellationToken) -> Result<()> {
    let bind_addr = state.config.server.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %bind_addr, "api listening");
    axum::serve(listener, build_api_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
