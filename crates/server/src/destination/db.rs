use sqlx::{SqliteConnection, SqlitePool};

use super::models::{Destination, DestinationFilter};
use crate::common::{Visibility, fetch_page, push_search};
use crate::db::row_exists;
use crate::error::{ApiError, ApiResult};
use crate::pagination::Page;

const DESTINATION_COLUMNS: &str = "id, name, slug, summary, description, region, country, \
     latitude, longitude, featured_image, gallery, highlights, category_id, featured, status, \
     meta_title, meta_description, created_at, updated_at";

pub async fn fetch_destination_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<Destination>, sqlx::Error> {
    let sql = format!("SELECT {DESTINATION_COLUMNS} FROM destinations WHERE id = ?");
    sqlx::query_as::<_, Destination>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_destination_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Destination>, sqlx::Error> {
    let sql = format!("SELECT {DESTINATION_COLUMNS} FROM destinations WHERE slug = ?");
    sqlx::query_as::<_, Destination>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

/// A referenced destination must exist.
pub async fn require_destination(pool: &SqlitePool, id: Option<&str>) -> ApiResult<()> {
    let Some(id) = id else {
        return Ok(());
    };
    if row_exists(pool, "destinations", id).await? {
        Ok(())
    } else {
        Err(ApiError::bad_request("destination not found"))
    }
}

pub async fn list_destinations(
    pool: &SqlitePool,
    filter: &DestinationFilter,
    visibility: Visibility,
    page: Page,
) -> Result<(Vec<Destination>, i64), sqlx::Error> {
    fetch_page(
        pool,
        "destinations",
        DESTINATION_COLUMNS,
        "featured DESC, name ASC",
        page,
        |qb| {
            visibility.push_status_filter(qb, filter.status);
            if let Some(category) = &filter.category {
                qb.push(" AND category_id = ");
                qb.push_bind(category.clone());
            }
            if let Some(featured) = filter.featured {
                qb.push(" AND featured = ");
                qb.push_bind(featured);
            }
            if let Some(country) = &filter.country {
                qb.push(" AND country = ");
                qb.push_bind(country.clone());
                qb.push(" COLLATE NOCASE");
            }
            push_search(qb, &["name", "summary", "region"], filter.search.as_deref());
        },
    )
    .await
}

pub async fn insert_destination(
    conn: &mut SqliteConnection,
    d: &Destination,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO destinations (id, name, slug, summary, description, region, country,
             latitude, longitude, featured_image, gallery, highlights, category_id, featured,
             status, meta_title, meta_description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&d.id)
    .bind(&d.name)
    .bind(&d.slug)
    .bind(d.summary.as_deref())
    .bind(d.description.as_deref())
    .bind(d.region.as_deref())
    .bind(&d.country)
    .bind(d.latitude)
    .bind(d.longitude)
    .bind(d.featured_image.as_deref())
    .bind(&d.gallery)
    .bind(&d.highlights)
    .bind(d.category_id.as_deref())
    .bind(d.featured)
    .bind(d.status)
    .bind(d.meta_title.as_deref())
    .bind(d.meta_description.as_deref())
    .bind(d.created_at)
    .bind(d.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_destination(
    conn: &mut SqliteConnection,
    d: &Destination,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE destinations SET name = ?, slug = ?, summary = ?, description = ?, region = ?,
             country = ?, latitude = ?, longitude = ?, featured_image = ?, gallery = ?,
             highlights = ?, category_id = ?, featured = ?, status = ?, meta_title = ?,
             meta_description = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&d.name)
    .bind(&d.slug)
    .bind(d.summary.as_deref())
    .bind(d.description.as_deref())
    .bind(d.region.as_deref())
    .bind(&d.country)
    .bind(d.latitude)
    .bind(d.longitude)
    .bind(d.featured_image.as_deref())
    .bind(&d.gallery)
    .bind(&d.highlights)
    .bind(d.category_id.as_deref())
    .bind(d.featured)
    .bind(d.status)
    .bind(d.meta_title.as_deref())
    .bind(d.meta_description.as_deref())
    .bind(d.updated_at)
    .bind(&d.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_destination(conn: &mut SqliteConnection, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM destinations WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
