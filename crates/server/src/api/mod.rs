pub mod extract;
pub mod server;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtKeys;
use crate::config::Config;
use crate::media::MediaStorage;

pub use extract::{ApiJson, ApiQuery};
pub use server::{build_api_router, run_api};

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtKeys>,
    pub media: Arc<MediaStorage>,
}
