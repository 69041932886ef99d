use sqlx::{SqliteConnection, SqlitePool};

use super::models::{Category, CategoryFilter, CategoryKind};
use crate::common::{fetch_page, push_search};
use crate::error::{ApiError, ApiResult};
use crate::pagination::Page;

const CATEGORY_COLUMNS: &str = "id, name, slug, kind, description, created_at, updated_at";

pub async fn fetch_category_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<Category>, sqlx::Error> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?");
    sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_category_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Category>, sqlx::Error> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = ?");
    sqlx::query_as::<_, Category>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn list_categories(
    pool: &SqlitePool,
    filter: &CategoryFilter,
    page: Page,
) -> Result<(Vec<Category>, i64), sqlx::Error> {
    fetch_page(pool, "categories", CATEGORY_COLUMNS, "name ASC", page, |qb| {
        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ");
            qb.push_bind(kind);
        }
        push_search(qb, &["name", "description"], filter.search.as_deref());
    })
    .await
}

pub async fn count_categories(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await
}

/// A referenced category must exist and group the right kind of resource.
pub async fn require_category(
    pool: &SqlitePool,
    id: Option<&str>,
    expected: CategoryKind,
) -> ApiResult<()> {
    let Some(id) = id else {
        return Ok(());
    };
    match fetch_category_by_id(pool, id).await? {
        Some(category) if category.kind == expected => Ok(()),
        Some(category) => Err(ApiError::bad_request(format!(
            "category '{}' is for {} entries, not {}",
            category.slug,
            category.kind.as_str(),
            expected.as_str()
        ))),
        None => Err(ApiError::bad_request("category not found")),
    }
}

/// Whether any destination, tour, post or event points at the category.
pub async fn category_in_use(conn: &mut SqliteConnection, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM destinations WHERE category_id = ?1)
             OR EXISTS (SELECT 1 FROM tours WHERE category_id = ?1)
             OR EXISTS (SELECT 1 FROM blog_posts WHERE category_id = ?1)
             OR EXISTS (SELECT 1 FROM events WHERE category_id = ?1)",
    )
    .bind(id)
    .fetch_one(conn)
    .await
}

pub async fn insert_category(
    conn: &mut SqliteConnection,
    category: &Category,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO categories (id, name, slug, kind, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.slug)
    .bind(category.kind)
    .bind(category.description.as_deref())
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_category(
    conn: &mut SqliteConnection,
    category: &Category,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE categories SET name = ?, slug = ?, kind = ?, description = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(category.kind)
    .bind(category.description.as_deref())
    .bind(category.updated_at)
    .bind(&category.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_category(conn: &mut SqliteConnection, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
