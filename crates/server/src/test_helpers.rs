use anyhow::Result;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::str::FromStr;
use std::sync::Arc;

use crate::api::AppState;
use crate::auth::{Actor, JwtKeys, Role, User};
use crate::config::Config;
use crate::media::MediaStorage;

pub const TEST_JWT_SECRET: &str = "test-secret-test-secret-test-secret!";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Creates an in-memory SQLite pool for testing
pub async fn create_test_pool() -> Result<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1) // In-memory databases should use a single connection
        .connect_with(connect_options)
        .await?;

    crate::db::run_migrations(&pool).await?;

    Ok(pool)
}

/// Config tuned for tests: cheap password hashing, uploads under `upload_dir`
pub fn test_config(upload_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.auth.password_iterations = 1_000;
    config.uploads.dir = upload_dir.to_path_buf();
    config.uploads.max_bytes = 1024;
    config
}

/// Full application state over an in-memory database
pub async fn test_state(upload_dir: &std::path::Path) -> Result<AppState> {
    let pool = create_test_pool().await?;
    let config = test_config(upload_dir);
    let jwt = JwtKeys::new(TEST_JWT_SECRET, &config.auth);
    let media = MediaStorage::new(&config.uploads);

    Ok(AppState {
        pool,
        config: Arc::new(config),
        jwt: Arc::new(jwt),
        media: Arc::new(media),
    })
}

/// Inserts a user with [`TEST_PASSWORD`] and returns it
pub async fn create_test_user(pool: &SqlitePool, email: &str, role: Role) -> Result<User> {
    let input = crate::auth::CreateUserInput {
        email: email.to_string(),
        name: "Test User".to_string(),
        password: TEST_PASSWORD.to_string(),
        role,
    };
    let user = crate::auth::create_user(pool, &Actor::system(), input, 1_000).await?;
    Ok(user)
}

/// Inserts a user and issues a bearer token for it
pub async fn token_for(state: &AppState, email: &str, role: Role) -> Result<String> {
    let user = create_test_user(&state.pool, email, role).await?;
    Ok(state.jwt.issue(&user)?)
}

/// Actor for service-level tests
pub fn editor_actor() -> Actor {
    Actor {
        id: None,
        label: "editor@test".to_string(),
        role: Role::Editor,
    }
}
