use sqlx::{SqliteConnection, SqlitePool};

use super::models::{Tour, TourFilter};
use crate::common::{Visibility, fetch_page, push_search};
use crate::pagination::Page;

const TOUR_COLUMNS: &str = "id, title, slug, summary, description, destination_id, category_id, \
     duration_days, price_cents, currency, max_group_size, difficulty, itinerary, inclusions, \
     exclusions, featured_image, featured, status, created_at, updated_at";

pub async fn fetch_tour_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Tour>, sqlx::Error> {
    let sql = format!("SELECT {TOUR_COLUMNS} FROM tours WHERE id = ?");
    sqlx::query_as::<_, Tour>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_tour_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Tour>, sqlx::Error> {
    let sql = format!("SELECT {TOUR_COLUMNS} FROM tours WHERE slug = ?");
    sqlx::query_as::<_, Tour>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn list_tours(
    pool: &SqlitePool,
    filter: &TourFilter,
    visibility: Visibility,
    page: Page,
) -> Result<(Vec<Tour>, i64), sqlx::Error> {
    fetch_page(
        pool,
        "tours",
        TOUR_COLUMNS,
        "featured DESC, created_at DESC",
        page,
        |qb| {
            visibility.push_status_filter(qb, filter.status);
            if let Some(destination) = &filter.destination {
                qb.push(" AND destination_id = ");
                qb.push_bind(destination.clone());
            }
            if let Some(category) = &filter.category {
                qb.push(" AND category_id = ");
                qb.push_bind(category.clone());
            }
            if let Some(featured) = filter.featured {
                qb.push(" AND featured = ");
                qb.push_bind(featured);
            }
            if let Some(difficulty) = filter.difficulty {
                qb.push(" AND difficulty = ");
                qb.push_bind(difficulty);
            }
            if let Some(min) = filter.min_price {
                qb.push(" AND price_cents >= ");
                qb.push_bind(min);
            }
            if let Some(max) = filter.max_price {
                qb.push(" AND price_cents <= ");
                qb.push_bind(max);
            }
            push_search(qb, &["title", "summary"], filter.search.as_deref());
        },
    )
    .await
}

pub async fn insert_tour(conn: &mut SqliteConnection, t: &Tour) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO tours (id, title, slug, summary, description, destination_id, category_id,
             duration_days, price_cents, currency, max_group_size, difficulty, itinerary,
             inclusions, exclusions, featured_image, featured, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&t.id)
    .bind(&t.title)
    .bind(&t.slug)
    .bind(t.summary.as_deref())
    .bind(t.description.as_deref())
    .bind(t.destination_id.as_deref())
    .bind(t.category_id.as_deref())
    .bind(t.duration_days)
    .bind(t.price_cents)
    .bind(&t.currency)
    .bind(t.max_group_size)
    .bind(t.difficulty)
    .bind(&t.itinerary)
    .bind(&t.inclusions)
    .bind(&t.exclusions)
    .bind(t.featured_image.as_deref())
    .bind(t.featured)
    .bind(t.status)
    .bind(t.created_at)
    .bind(t.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_tour(conn: &mut SqliteConnection, t: &Tour) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE tours SET title = ?, slug = ?, summary = ?, description = ?, destination_id = ?,
             category_id = ?, duration_days = ?, price_cents = ?, currency = ?,
             max_group_size = ?, difficulty = ?, itinerary = ?, inclusions = ?, exclusions = ?,
             featured_image = ?, featured = ?, status = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&t.title)
    .bind(&t.slug)
    .bind(t.summary.as_deref())
    .bind(t.description.as_deref())
    .bind(t.destination_id.as_deref())
    .bind(t.category_id.as_deref())
    .bind(t.duration_days)
    .bind(t.price_cents)
    .bind(&t.currency)
    .bind(t.max_group_size)
    .bind(t.difficulty)
    .bind(&t.itinerary)
    .bind(&t.inclusions)
    .bind(&t.exclusions)
    .bind(t.featured_image.as_deref())
    .bind(t.featured)
    .bind(t.status)
    .bind(t.updated_at)
    .bind(&t.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_tour(conn: &mut SqliteConnection, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tours WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
