use sqlx::SqlitePool;
use sqlx::types::Json;

use super::db::{delete_post as delete_row, fetch_post_by_id, insert_post, update_post as update_row};
use super::markdown::{reading_minutes, render_markdown};
use super::models::{BlogPost, CreateBlogPostInput, UpdateBlogPostInput};
use crate::audit::{self, AuditAction, AuditEntry, EntityType, diff};
use crate::auth::Actor;
use crate::category::{CategoryKind, require_category};
use crate::common::{PublishStatus, now};
use crate::error::{ApiError, ApiResult};
use crate::validation::{SlugTable, Validator, clean_optional, resolve_slug};

/// Lowercase, trim and dedupe tags, keeping first-seen order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn validate(post: &mut BlogPost, slug: Option<&str>) -> ApiResult<()> {
    let mut v = Validator::new();
    v.slug("slug", slug);
    v.required("title", &post.title, 200);
    v.required("content", &post.content, 200_000);
    v.optional_max_len("excerpt", post.excerpt.as_deref(), 500);
    if post.tags.len() > 20 {
        v.add("tags", "at most 20 tags");
    }
    v.string_list("tags", &post.tags, 40);
    post.featured_image = v.asset("featuredImage", post.featured_image.as_deref());
    v.finish()
}

/// Derived fields: rendered HTML, reading time, first publish stamp.
fn refresh_derived(post: &mut BlogPost) {
    post.content_html = render_markdown(&post.content);
    post.reading_minutes = reading_minutes(&post.content);
    if post.status == PublishStatus::Published && post.published_at.is_none() {
        post.published_at = Some(now());
    }
}

pub async fn create_post(
    pool: &SqlitePool,
    actor: &Actor,
    input: CreateBlogPostInput,
) -> ApiResult<BlogPost> {
    let timestamp = now();
    let mut post = BlogPost {
        id: cuid2::create_id(),
        title: input.title.trim().to_string(),
        slug: String::new(),
        excerpt: clean_optional(input.excerpt),
        content: input.content,
        content_html: String::new(),
        reading_minutes: 1,
        author_id: actor.id.clone(),
        category_id: clean_optional(input.category_id),
        tags: Json(normalize_tags(input.tags)),
        featured_image: clean_optional(input.featured_image),
        status: input.status,
        published_at: None,
        created_at: timestamp,
        updated_at: timestamp,
    };
    validate(&mut post, input.slug.as_deref())?;
    require_category(pool, post.category_id.as_deref(), CategoryKind::Blog).await?;
    refresh_derived(&mut post);

    post.slug = resolve_slug(pool, SlugTable::BlogPosts, input.slug.as_deref(), &post.title, None).await?;

    let mut tx = pool.begin().await?;
    insert_post(&mut tx, &post).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Create, EntityType::BlogPost, &post.id)
            .summary(format!("created blog post {}", post.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(post)
}

pub async fn update_post(
    pool: &SqlitePool,
    actor: &Actor,
    id: &str,
    input: UpdateBlogPostInput,
) -> ApiResult<BlogPost> {
    let before = fetch_post_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("blog post"))?;

    let mut post = before.clone();
    if let Some(title) = input.title {
        post.title = title.trim().to_string();
    }
    if input.excerpt.is_some() {
        post.excerpt = clean_optional(input.excerpt);
    }
    if let Some(content) = input.content {
        post.content = content;
    }
    if input.category_id.is_some() {
        post.category_id = clean_optional(input.category_id);
    }
    if let Some(tags) = input.tags {
        post.tags = Json(normalize_tags(tags));
    }
    if input.featured_image.is_some() {
        post.featured_image = clean_optional(input.featured_image);
    }
    if let Some(status) = input.status {
        post.status = status;
    }
    validate(&mut post, input.slug.as_deref())?;
    if post.category_id != before.category_id {
        require_category(pool, post.category_id.as_deref(), CategoryKind::Blog).await?;
    }
    refresh_derived(&mut post);

    if input.slug.is_some() || post.title != before.title {
        post.slug = resolve_slug(
            pool,
            SlugTable::BlogPosts,
            input.slug.as_deref(),
            &post.title,
            Some(&post.id),
        )
        .await?;
    }
    post.updated_at = now();

    let mut tx = pool.begin().await?;
    update_row(&mut tx, &post).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Update, EntityType::BlogPost, &post.id)
            .changes(diff(&before, &post)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(post)
}

pub async fn delete_post(pool: &SqlitePool, actor: &Actor, id: &str) -> ApiResult<()> {
    let existing = fetch_post_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("blog post"))?;

    let mut tx = pool.begin().await?;
    delete_row(&mut tx, id).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Delete, EntityType::BlogPost, id)
            .summary(format!("deleted blog post {}", existing.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::db::list_posts;
    use crate::blog::models::BlogFilter;
    use crate::common::Visibility;
    use crate::pagination::Page;
    use crate::test_helpers::{create_test_pool, editor_actor};

    fn input(title: &str) -> CreateBlogPostInput {
        CreateBlogPostInput {
            title: title.to_string(),
            content: "A **short** post about the coast.".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(vec![" Beach ".into(), "beach".into(), "".into(), "Food".into()]);
        assert_eq!(tags, vec!["beach".to_string(), "food".to_string()]);
    }

    #[tokio::test]
    async fn test_create_renders_html() {
        let pool = create_test_pool().await.unwrap();
        let post = create_post(&pool, &editor_actor(), input("Coastal Walks")).await.unwrap();
        assert!(post.content_html.contains("<strong>short</strong>"));
        assert_eq!(post.reading_minutes, 1);
        assert_eq!(post.published_at, None);
    }

    #[tokio::test]
    async fn test_published_at_is_stamped_once() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let post = create_post(&pool, &actor, input("Street Food")).await.unwrap();

        let published = update_post(
            &pool,
            &actor,
            &post.id,
            UpdateBlogPostInput {
                status: Some(PublishStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let stamped = published.published_at.expect("stamped on publish");

        let archived = update_post(
            &pool,
            &actor,
            &post.id,
            UpdateBlogPostInput {
                status: Some(PublishStatus::Archived),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(archived.published_at, Some(stamped));

        let republished = update_post(
            &pool,
            &actor,
            &post.id,
            UpdateBlogPostInput {
                status: Some(PublishStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(republished.published_at, Some(stamped));
    }

    #[tokio::test]
    async fn test_tag_filter() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let mut tagged = input("Diving Guide");
        tagged.tags = vec!["Diving".into(), "reef".into()];
        create_post(&pool, &actor, tagged).await.unwrap();
        create_post(&pool, &actor, input("Market Day")).await.unwrap();

        let filter = BlogFilter {
            tag: Some("DIVING".into()),
            ..Default::default()
        };
        let (posts, total) = list_posts(&pool, &filter, Visibility::Staff, Page { page: 1, limit: 10 })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].title, "Diving Guide");
    }

    #[tokio::test]
    async fn test_content_is_required() {
        let pool = create_test_pool().await.unwrap();
        let mut create = input("Empty");
        create.content = "   ".into();
        let err = create_post(&pool, &editor_actor(), create).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
