use sqlx::{SqliteConnection, SqlitePool};

use super::models::{Media, MediaFilter};
use crate::common::{fetch_page, like_prefix, push_search};
use crate::pagination::Page;

const MEDIA_COLUMNS: &str = "id, original_name, stored_name, mime_type, size_bytes, url, \
     alt_text, uploaded_by, created_at";

pub async fn fetch_media_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Media>, sqlx::Error> {
    let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?");
    sqlx::query_as::<_, Media>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_media(
    pool: &SqlitePool,
    filter: &MediaFilter,
    page: Page,
) -> Result<(Vec<Media>, i64), sqlx::Error> {
    fetch_page(pool, "media", MEDIA_COLUMNS, "created_at DESC", page, |qb| {
        if let Some(prefix) = filter.mime_prefix.as_deref().filter(|p| !p.trim().is_empty()) {
            qb.push(" AND mime_type LIKE ");
            qb.push_bind(like_prefix(&prefix.to_ascii_lowercase()));
            qb.push(" ESCAPE '\\'");
        }
        push_search(qb, &["original_name", "alt_text"], filter.search.as_deref());
    })
    .await
}

pub async fn insert_media(conn: &mut SqliteConnection, m: &Media) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO media (id, original_name, stored_name, mime_type, size_bytes, url,
             alt_text, uploaded_by, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&m.id)
    .bind(&m.original_name)
    .bind(&m.stored_name)
    .bind(&m.mime_type)
    .bind(m.size_bytes)
    .bind(&m.url)
    .bind(m.alt_text.as_deref())
    .bind(m.uploaded_by.as_deref())
    .bind(m.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_alt_text(
    conn: &mut SqliteConnection,
    id: &str,
    alt_text: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE media SET alt_text = ? WHERE id = ?")
        .bind(alt_text)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_media(conn: &mut SqliteConnection, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM media WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
