use sqlx::{SqliteConnection, SqlitePool};

use super::models::{BlogFilter, BlogPost};
use crate::common::{Visibility, fetch_page, push_search};
use crate::pagination::Page;

const POST_COLUMNS: &str = "id, title, slug, excerpt, content, content_html, reading_minutes, \
     author_id, category_id, tags, featured_image, status, published_at, created_at, updated_at";

pub async fn fetch_post_by_id(pool: &SqlitePool, id: &str) -> Result<Option<BlogPost>, sqlx::Error> {
    let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ?");
    sqlx::query_as::<_, BlogPost>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_post_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<BlogPost>, sqlx::Error> {
    let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = ?");
    sqlx::query_as::<_, BlogPost>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn list_posts(
    pool: &SqlitePool,
    filter: &BlogFilter,
    visibility: Visibility,
    page: Page,
) -> Result<(Vec<BlogPost>, i64), sqlx::Error> {
    fetch_page(
        pool,
        "blog_posts",
        POST_COLUMNS,
        "published_at DESC, created_at DESC",
        page,
        |qb| {
            visibility.push_status_filter(qb, filter.status);
            if let Some(category) = &filter.category {
                qb.push(" AND category_id = ");
                qb.push_bind(category.clone());
            }
            if let Some(author) = &filter.author {
                qb.push(" AND author_id = ");
                qb.push_bind(author.clone());
            }
            if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                qb.push(" AND EXISTS (SELECT 1 FROM json_each(blog_posts.tags) WHERE value = ");
                qb.push_bind(tag.to_lowercase());
                qb.push(")");
            }
            push_search(qb, &["title", "excerpt", "content"], filter.search.as_deref());
        },
    )
    .await
}

pub async fn insert_post(conn: &mut SqliteConnection, p: &BlogPost) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO blog_posts (id, title, slug, excerpt, content, content_html,
             reading_minutes, author_id, category_id, tags, featured_image, status,
             published_at, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&p.id)
    .bind(&p.title)
    .bind(&p.slug)
    .bind(p.excerpt.as_deref())
    .bind(&p.content)
    .bind(&p.content_html)
    .bind(p.reading_minutes)
    .bind(p.author_id.as_deref())
    .bind(p.category_id.as_deref())
    .bind(&p.tags)
    .bind(p.featured_image.as_deref())
    .bind(p.status)
    .bind(p.published_at)
    .bind(p.created_at)
    .bind(p.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_post(conn: &mut SqliteConnection, p: &BlogPost) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE blog_posts SET title = ?, slug = ?, excerpt = ?, content = ?, content_html = ?,
             reading_minutes = ?, category_id = ?, tags = ?, featured_image = ?, status = ?,
             published_at = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&p.title)
    .bind(&p.slug)
    .bind(p.excerpt.as_deref())
    .bind(&p.content)
    .bind(&p.content_html)
    .bind(p.reading_minutes)
    .bind(p.category_id.as_deref())
    .bind(&p.tags)
    .bind(p.featured_image.as_deref())
    .bind(p.status)
    .bind(p.published_at)
    .bind(p.updated_at)
    .bind(&p.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_post(conn: &mut SqliteConnection, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
