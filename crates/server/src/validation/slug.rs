use sqlx::SqlitePool;

use crate::error::{ApiError, ApiResult};

const MAX_SLUG_LEN: usize = 100;
const MAX_GENERATED_LEN: usize = 80;
const MAX_SUFFIX_ATTEMPTS: u32 = 1000;
const FALLBACK_SLUG: &str = "untitled";

/// Tables whose rows carry a globally unique slug column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugTable {
    Categories,
    Destinations,
    Tours,
    BlogPosts,
    Events,
}

impl SlugTable {
    fn name(self) -> &'static str {
        match self {
            SlugTable::Categories => "categories",
            SlugTable::Destinations => "destinations",
            SlugTable::Tours => "tours",
            SlugTable::BlogPosts => "blog_posts",
            SlugTable::Events => "events",
        }
    }
}

/// Stored slugs are lowercase kebab-case: no leading, trailing or doubled hyphen.
pub fn validate_slug(slug: &str) -> Result<(), &'static str> {
    if slug.is_empty() {
        return Err("must contain at least one letter or digit");
    }
    let well_formed = slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err("must be lowercase kebab-case")
    }
}

/// Derive a lowercase kebab-case slug from free text.
///
/// Non-ASCII text is transliterated (`Đà Nẵng` becomes `da-nang`), then the
/// result is cut back to a whole word within the generated length limit.
/// Text with nothing transliterable yields an empty string.
pub fn slugify(text: &str) -> String {
    truncate_on_boundary(&::slug::slugify(text), MAX_GENERATED_LEN)
}

fn truncate_on_boundary(slug: &str, max_len: usize) -> String {
    if slug.len() <= max_len {
        return slug.to_string();
    }

    // ASCII only, so byte offsets are char boundaries.
    if slug.as_bytes()[max_len] == b'-' {
        return slug[..max_len].trim_end_matches('-').to_string();
    }
    let cut = &slug[..max_len];
    match cut.rfind('-') {
        Some(idx) if idx > 0 => cut[..idx].to_string(),
        _ => cut.trim_end_matches('-').to_string(),
    }
}

pub async fn slug_exists(
    pool: &SqlitePool,
    table: SlugTable,
    slug: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let exists: Option<i64> = match exclude_id {
        Some(id) => {
            let sql = format!("SELECT 1 FROM {} WHERE slug = ? AND id != ? LIMIT 1", table.name());
            sqlx::query_scalar(&sql)
                .bind(slug)
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        None => {
            let sql = format!("SELECT 1 FROM {} WHERE slug = ? LIMIT 1", table.name());
            sqlx::query_scalar(&sql)
                .bind(slug)
                .fetch_optional(pool)
                .await?
        }
    };
    Ok(exists.is_some())
}

/// Find a free slug in `table` starting from `base`.
///
/// Tries `base`, then `base-1`, `base-2`, ... skipping the row `exclude_id`
/// so an update can keep its own slug.
pub async fn ensure_unique_slug(
    pool: &SqlitePool,
    table: SlugTable,
    base: &str,
    exclude_id: Option<&str>,
) -> ApiResult<String> {
    let base = if base.is_empty() { FALLBACK_SLUG } else { base };

    if !slug_exists(pool, table, base, exclude_id).await? {
        return Ok(base.to_string());
    }

    for suffix in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate = format!("{base}-{suffix}");
        if !slug_exists(pool, table, &candidate, exclude_id).await? {
            tracing::debug!(table = table.name(), %candidate, "slug collision resolved");
            return Ok(candidate);
        }
    }

    Err(ApiError::conflict(format!(
        "could not find a free slug for '{base}'"
    )))
}

/// Slug to store for a new or renamed record: the explicit slug when given,
/// otherwise `source`, slugified either way and made unique in `table`.
///
/// An explicit slug that slugifies to nothing is rejected by
/// [`Validator::slug`](super::Validator::slug) before this runs; here it
/// falls back to `source`.
pub async fn resolve_slug(
    pool: &SqlitePool,
    table: SlugTable,
    explicit: Option<&str>,
    source: &str,
    exclude_id: Option<&str>,
) -> ApiResult<String> {
    let base = explicit
        .map(slugify)
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| slugify(source));
    ensure_unique_slug(pool, table, &base, exclude_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_pool;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Leading and trailing  "), "leading-and-trailing");
        assert_eq!(slugify("Tour #1: Sunset & Wine!"), "tour-1-sunset-wine");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }

    #[test]
    fn test_slugify_transliterates() {
        assert_eq!(slugify("Côte d'Azur"), "cote-d-azur");
        assert_eq!(slugify("São Tomé"), "sao-tome");
        assert_eq!(slugify("Straße in Zürich"), "strasse-in-zurich");
        assert_eq!(slugify("Đà Nẵng"), "da-nang");
        assert_eq!(slugify("Ελλάδα"), "ellada");
    }

    #[test]
    fn test_slugify_nothing_sluggable() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("  -- "), "");
    }

    #[test]
    fn test_slugify_truncates_on_hyphen() {
        let title = "word ".repeat(40);
        let slug = slugify(&title);
        assert!(slug.len() <= MAX_GENERATED_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.split('-').all(|part| part == "word"));
    }

    #[test]
    fn test_truncate_keeps_word_ending_at_limit() {
        // 16 five-letter words: the 16th ends exactly at byte 95.
        let slug = vec!["abcde"; 20].join("-");
        assert_eq!(slug.as_bytes()[95], b'-');
        assert_eq!(truncate_on_boundary(&slug, 95), vec!["abcde"; 16].join("-"));
        assert_eq!(truncate_on_boundary(&slug, 97), vec!["abcde"; 16].join("-"));
        assert_eq!(slugify(&"abcd ".repeat(30)).len(), 79);
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("bali").is_ok());
        assert_eq!(
            validate_slug(""),
            Err("must contain at least one letter or digit")
        );
        assert!(validate_slug("bali-2024").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Bali").is_err());
        assert!(validate_slug("-bali").is_err());
        assert!(validate_slug("bali-").is_err());
        assert!(validate_slug("ba--li").is_err());
        assert!(validate_slug("ba_li").is_err());
        assert!(validate_slug(&"a".repeat(101)).is_err());
    }

    async fn insert_category(pool: &SqlitePool, id: &str, slug: &str) {
        sqlx::query(
            "INSERT INTO categories (id, name, slug, kind, created_at, updated_at)
             VALUES (?, ?, ?, 'tour', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(slug)
        .bind(slug)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_unique_slug_appends_suffix() {
        let pool = create_test_pool().await.unwrap();

        let slug = ensure_unique_slug(&pool, SlugTable::Categories, "hiking", None)
            .await
            .unwrap();
        assert_eq!(slug, "hiking");

        insert_category(&pool, "c1", "hiking").await;
        let slug = ensure_unique_slug(&pool, SlugTable::Categories, "hiking", None)
            .await
            .unwrap();
        assert_eq!(slug, "hiking-1");

        insert_category(&pool, "c2", "hiking-1").await;
        let slug = ensure_unique_slug(&pool, SlugTable::Categories, "hiking", None)
            .await
            .unwrap();
        assert_eq!(slug, "hiking-2");
    }

    #[tokio::test]
    async fn test_ensure_unique_slug_ignores_own_row() {
        let pool = create_test_pool().await.unwrap();
        insert_category(&pool, "c1", "diving").await;

        let slug = ensure_unique_slug(&pool, SlugTable::Categories, "diving", Some("c1"))
            .await
            .unwrap();
        assert_eq!(slug, "diving");
    }

    #[tokio::test]
    async fn test_ensure_unique_slug_empty_base_falls_back() {
        let pool = create_test_pool().await.unwrap();
        let slug = ensure_unique_slug(&pool, SlugTable::Categories, "", None)
            .await
            .unwrap();
        assert_eq!(slug, "untitled");
    }

    #[tokio::test]
    async fn test_resolve_slug_prefers_explicit() {
        let pool = create_test_pool().await.unwrap();
        let slug = resolve_slug(
            &pool,
            SlugTable::Categories,
            Some("island-hopping"),
            "Something Else",
            None,
        )
        .await
        .unwrap();
        assert_eq!(slug, "island-hopping");

        let slug = resolve_slug(&pool, SlugTable::Categories, None, "Food & Wine", None)
            .await
            .unwrap();
        assert_eq!(slug, "food-wine");

        let slug = resolve_slug(&pool, SlugTable::Categories, Some("Bali Trip"), "x", None)
            .await
            .unwrap();
        assert_eq!(slug, "bali-trip");

        let slug = resolve_slug(&pool, SlugTable::Categories, Some("!!"), "Night Market", None)
            .await
            .unwrap();
        assert_eq!(slug, "night-market");
    }
}
