use sqlx::{SqliteConnection, SqlitePool};

use super::models::{Event, EventFilter};
use crate::common::{Visibility, fetch_page, now, push_search};
use crate::pagination::Page;

const EVENT_COLUMNS: &str = "id, title, slug, description, destination_id, category_id, venue, \
     starts_at, ends_at, ticket_url, featured_image, status, created_at, updated_at";

pub async fn fetch_event_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Event>, sqlx::Error> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?");
    sqlx::query_as::<_, Event>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_event_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Event>, sqlx::Error> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE slug = ?");
    sqlx::query_as::<_, Event>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn list_events(
    pool: &SqlitePool,
    filter: &EventFilter,
    visibility: Visibility,
    page: Page,
) -> Result<(Vec<Event>, i64), sqlx::Error> {
    let cutoff = now();
    fetch_page(
        pool,
        "events",
        EVENT_COLUMNS,
        "starts_at ASC",
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
            if filter.upcoming == Some(true) {
                qb.push(" AND COALESCE(ends_at, starts_at) >= ");
                qb.push_bind(cutoff);
            }
            push_search(qb, &["title", "venue", "description"], filter.search.as_deref());
        },
    )
    .await
}

pub async fn insert_event(conn: &mut SqliteConnection, e: &Event) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO events (id, title, slug, description, destination_id, category_id, venue,
             starts_at, ends_at, ticket_url, featured_image, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&e.id)
    .bind(&e.title)
    .bind(&e.slug)
    .bind(e.description.as_deref())
    .bind(e.destination_id.as_deref())
    .bind(e.category_id.as_deref())
    .bind(e.venue.as_deref())
    .bind(e.starts_at)
    .bind(e.ends_at)
    .bind(e.ticket_url.as_deref())
    .bind(e.featured_image.as_deref())
    .bind(e.status)
    .bind(e.created_at)
    .bind(e.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_event(conn: &mut SqliteConnection, e: &Event) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE events SET title = ?, slug = ?, description = ?, destination_id = ?,
             category_id = ?, venue = ?, starts_at = ?, ends_at = ?, ticket_url = ?,
             featured_image = ?, status = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&e.title)
    .bind(&e.slug)
    .bind(e.description.as_deref())
    .bind(e.destination_id.as_deref())
    .bind(e.category_id.as_deref())
    .bind(e.venue.as_deref())
    .bind(e.starts_at)
    .bind(e.ends_at)
    .bind(e.ticket_url.as_deref())
    .bind(e.featured_image.as_deref())
    .bind(e.status)
    .bind(e.updated_at)
    .bind(&e.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_event(conn: &mut SqliteConnection, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
