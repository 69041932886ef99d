use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use server::api::{AppState, run_api};
use server::auth::JwtKeys;
use server::config;
use server::db::init_pool;
use server::media::MediaStorage;
use server::metrics_exporter::init_metrics;
use server::supervisor::Supervisor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    let config = config::loader::load()?;
    let secret = config.jwt_secret().map_err(|err| anyhow!(err))?;
    init_metrics()?;

    let (pool, _db_root) = init_pool(&config.database).await?;

    std::fs::create_dir_all(&config.uploads.dir).with_context(|| {
        format!(
            "failed to create upload directory: {}",
            config.uploads.dir.display()
        )
    })?;

    let state = AppState {
        pool,
        jwt: Arc::new(JwtKeys::new(&secret, &config.auth)),
        media: Arc::new(MediaStorage::new(&config.uploads)),
        config: Arc::new(config),
    };

    let mut supervisor = Supervisor::new();
    supervisor.spawn("api", move |shutdown| run_api(state, shutdown));
    supervisor.run().await
}
