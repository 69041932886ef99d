use sqlx::{SqliteConnection, SqlitePool};

use super::models::{ContentKind, ContentVersion};
use crate::common::{fetch_page, now};
use crate::pagination::Page;

const VERSION_COLUMNS: &str =
    "id, kind, title, blocks, version, is_active, created_by, created_at, updated_at";

pub async fn fetch_version(
    pool: &SqlitePool,
    kind: ContentKind,
    id: &str,
) -> Result<Option<ContentVersion>, sqlx::Error> {
    let sql = format!("SELECT {VERSION_COLUMNS} FROM content_versions WHERE id = ? AND kind = ?");
    sqlx::query_as::<_, ContentVersion>(&sql)
        .bind(id)
        .bind(kind)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_active(
    pool: &SqlitePool,
    kind: ContentKind,
) -> Result<Option<ContentVersion>, sqlx::Error> {
    let sql =
        format!("SELECT {VERSION_COLUMNS} FROM content_versions WHERE kind = ? AND is_active = 1");
    sqlx::query_as::<_, ContentVersion>(&sql)
        .bind(kind)
        .fetch_optional(pool)
        .await
}

pub async fn list_versions(
    pool: &SqlitePool,
    kind: ContentKind,
    page: Page,
) -> Result<(Vec<ContentVersion>, i64), sqlx::Error> {
    fetch_page(
        pool,
        "content_versions",
        VERSION_COLUMNS,
        "version DESC",
        page,
        |qb| {
            qb.push(" AND kind = ");
            qb.push_bind(kind);
        },
    )
    .await
}

pub async fn next_version_number(
    conn: &mut SqliteConnection,
    kind: ContentKind,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) + 1 FROM content_versions WHERE kind = ?")
        .bind(kind)
        .fetch_one(conn)
        .await
}

pub async fn insert_version(
    conn: &mut SqliteConnection,
    v: &ContentVersion,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO content_versions (id, kind, title, blocks, version, is_active, created_by,
             created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&v.id)
    .bind(v.kind)
    .bind(&v.title)
    .bind(&v.blocks)
    .bind(v.version)
    .bind(v.is_active)
    .bind(v.created_by.as_deref())
    .bind(v.created_at)
    .bind(v.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_version(
    conn: &mut SqliteConnection,
    v: &ContentVersion,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE content_versions SET title = ?, blocks = ?, updated_at = ? WHERE id = ?")
        .bind(&v.title)
        .bind(&v.blocks)
        .bind(v.updated_at)
        .bind(&v.id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Deactivate every version of `kind`, then activate `id`. Run inside a transaction.
pub async fn set_active(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    id: &str,
) -> Result<u64, sqlx::Error> {
    sqlx::query("UPDATE content_versions SET is_active = 0 WHERE kind = ? AND is_active = 1")
        .bind(kind)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query(
        "UPDATE content_versions SET is_active = 1, updated_at = ? WHERE id = ? AND kind = ?",
    )
    .bind(now())
    .bind(id)
    .bind(kind)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Deletes the version only while it is inactive; 0 rows means it is live or gone.
pub async fn delete_inactive_version(
    conn: &mut SqliteConnection,
    kind: ContentKind,
    id: &str,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM content_versions WHERE id = ? AND kind = ? AND is_active = 0")
            .bind(id)
            .bind(kind)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}
