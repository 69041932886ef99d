use sqlx::SqlitePool;

use super::db::{
    category_in_use, delete_category as delete_row, fetch_category_by_id, insert_category,
    update_category as update_row,
};
use super::models::{Category, CreateCategoryInput, UpdateCategoryInput};
use crate::audit::{self, AuditAction, AuditEntry, EntityType, diff};
use crate::auth::Actor;
use crate::common::now;
use crate::error::{ApiError, ApiResult};
use crate::validation::{SlugTable, Validator, clean_optional, resolve_slug};

fn validate(category: &Category, slug: Option<&str>) -> ApiResult<()> {
    let mut v = Validator::new();
    v.slug("slug", slug);
    v.required("name", &category.name, 80);
    v.optional_max_len("description", category.description.as_deref(), 1000);
    v.finish()
}

pub async fn create_category(
    pool: &SqlitePool,
    actor: &Actor,
    input: CreateCategoryInput,
) -> ApiResult<Category> {
    let timestamp = now();
    let mut category = Category {
        id: cuid2::create_id(),
        name: input.name.trim().to_string(),
        slug: String::new(),
        kind: input.kind,
        description: clean_optional(input.description),
        created_at: timestamp,
        updated_at: timestamp,
    };
    validate(&category, input.slug.as_deref())?;

    category.slug = resolve_slug(
        pool,
        SlugTable::Categories,
        input.slug.as_deref(),
        &category.name,
        None,
    )
    .await?;

    let mut tx = pool.begin().await?;
    insert_category(&mut tx, &category).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Create, EntityType::Category, &category.id)
            .summary(format!("created category {}", category.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(category)
}

pub async fn update_category(
    pool: &SqlitePool,
    actor: &Actor,
    id: &str,
    input: UpdateCategoryInput,
) -> ApiResult<Category> {
    let before = fetch_category_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("category"))?;

    let mut category = before.clone();
    if let Some(name) = input.name {
        category.name = name.trim().to_string();
    }
    if let Some(kind) = input.kind {
        category.kind = kind;
    }
    if input.description.is_some() {
        category.description = clean_optional(input.description);
    }
    validate(&category, input.slug.as_deref())?;

    if input.slug.is_some() || category.name != before.name {
        category.slug = resolve_slug(
            pool,
            SlugTable::Categories,
            input.slug.as_deref(),
            &category.name,
            Some(&category.id),
        )
        .await?;
    }
    category.updated_at = now();

    let mut tx = pool.begin().await?;
    // Referencing rows were checked against the old kind.
    if category.kind != before.kind && category_in_use(&mut tx, id).await? {
        return Err(ApiError::conflict(format!(
            "category '{}' is in use; its kind cannot change",
            before.slug
        )));
    }
    update_row(&mut tx, &category).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Update, EntityType::Category, &category.id)
            .changes(diff(&before, &category)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(category)
}

pub async fn delete_category(pool: &SqlitePool, actor: &Actor, id: &str) -> ApiResult<()> {
    let existing = fetch_category_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("category"))?;

    let mut tx = pool.begin().await?;
    delete_row(&mut tx, id).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Delete, EntityType::Category, id)
            .summary(format!("deleted category {}", existing.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::models::CategoryKind;
    use crate::test_helpers::{create_test_pool, editor_actor};

    fn input(name: &str) -> CreateCategoryInput {
        CreateCategoryInput {
            name: name.to_string(),
            slug: None,
            kind: CategoryKind::Tour,
            description: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_generates_unique_slugs() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();

        let first = create_category(&pool, &actor, input("Wine Tours")).await.unwrap();
        let second = create_category(&pool, &actor, input("Wine Tours")).await.unwrap();
        assert_eq!(first.slug, "wine-tours");
        assert_eq!(second.slug, "wine-tours-1");
        assert_eq!(first.description, None);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let pool = create_test_pool().await.unwrap();
        let err = create_category(&pool, &editor_actor(), input("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_renames_and_reslugs() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let created = create_category(&pool, &actor, input("Hiking")).await.unwrap();

        let updated = update_category(
            &pool,
            &actor,
            &created.id,
            UpdateCategoryInput {
                name: Some("Mountain Hiking".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.slug, "mountain-hiking");

        // Unchanged name keeps the slug.
        let same = update_category(
            &pool,
            &actor,
            &created.id,
            UpdateCategoryInput {
                description: Some("Trails and peaks".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(same.slug, "mountain-hiking");
        assert_eq!(same.description.as_deref(), Some("Trails and peaks"));

        let changes: Option<String> = sqlx::query_scalar(
            "SELECT changes FROM audit_logs WHERE entity_id = ? AND action = 'update' ORDER BY rowid LIMIT 1",
        )
        .bind(&created.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let changes: serde_json::Value = serde_json::from_str(&changes.unwrap()).unwrap();
        assert_eq!(changes["name"]["to"], "Mountain Hiking");
        assert_eq!(changes["slug"]["from"], "hiking");
    }

    #[tokio::test]
    async fn test_kind_is_locked_while_referenced() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let mut category_input = input("Beaches");
        category_input.kind = CategoryKind::Destination;
        let category = create_category(&pool, &actor, category_input).await.unwrap();
        let to_blog = || UpdateCategoryInput {
            kind: Some(CategoryKind::Blog),
            ..Default::default()
        };

        sqlx::query(
            "INSERT INTO destinations (id, name, slug, country, category_id, created_at, updated_at)
             VALUES ('d1', 'Bali', 'bali', 'Indonesia', ?, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(&category.id)
        .execute(&pool)
        .await
        .unwrap();

        let err = update_category(&pool, &actor, &category.id, to_blog())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        let kind: String = sqlx::query_scalar("SELECT kind FROM categories WHERE id = ?")
            .bind(&category.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(kind, "destination");

        sqlx::query("DELETE FROM destinations WHERE id = 'd1'")
            .execute(&pool)
            .await
            .unwrap();
        let updated = update_category(&pool, &actor, &category.id, to_blog()).await.unwrap();
        assert_eq!(updated.kind, CategoryKind::Blog);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let pool = create_test_pool().await.unwrap();
        let err = delete_category(&pool, &editor_actor(), "nope").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound("category")));
    }

    #[tokio::test]
    async fn test_delete_nulls_references() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let mut category_input = input("Islands");
        category_input.kind = CategoryKind::Destination;
        let category = create_category(&pool, &actor, category_input).await.unwrap();

        sqlx::query(
            "INSERT INTO destinations (id, name, slug, country, category_id, created_at, updated_at)
             VALUES ('d1', 'Bali', 'bali', 'Indonesia', ?, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(&category.id)
        .execute(&pool)
        .await
        .unwrap();

        delete_category(&pool, &actor, &category.id).await.unwrap();

        let category_id: Option<String> =
            sqlx::query_scalar("SELECT category_id FROM destinations WHERE id = 'd1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(category_id, None);
    }
}
