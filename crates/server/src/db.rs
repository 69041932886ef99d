use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::config::Database;

const CMS_DB_FILENAME: &str = "cms.db";

/// Initialize the CMS database, running migrations as needed.
pub async fn init_pool(settings: &Database) -> Result<(SqlitePool, PathBuf)> {
    let db_root_path = normalize_path(&settings.path)?;
    std::fs::create_dir_all(&db_root_path)
        .with_context(|| format!("failed to create DB path: {}", db_root_path.display()))?;

    let cms_db_path = db_root_path.join(CMS_DB_FILENAME);
    let db_uri = format!("sqlite://{}", cms_db_path.to_string_lossy());

    let connect_options = SqliteConnectOptions::from_str(&db_uri)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(connect_options)
        .await?;

    run_migrations(&pool).await?;

    tracing::info!(path = %cms_db_path.display(), "database ready");
    Ok((pool, db_root_path))
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    Ok(())
}

/// Returns true when a row with `id` exists in `table`.
///
/// `table` is always a compile-time constant from this crate, never user input.
pub async fn row_exists(pool: &SqlitePool, table: &'static str, id: &str) -> Result<bool, sqlx::Error> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ? LIMIT 1");
    let exists: Option<i64> = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(exists.is_some())
}

pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().context("failed to read current working directory")?;
    Ok(cwd.join(path))
}
