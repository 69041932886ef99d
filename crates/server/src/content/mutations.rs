use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::types::Json;

use super::db::{
    delete_inactive_version, fetch_version, insert_version, next_version_number, set_active,
    update_version as update_row,
};
use super::models::{ContentKind, ContentVersion, CreateContentInput, UpdateContentInput};
use crate::audit::{self, AuditAction, AuditEntry, EntityType, Recorded, diff};
use crate::auth::Actor;
use crate::common::now;
use crate::error::{ApiError, ApiResult};
use crate::validation::Validator;

fn validate(version: &ContentVersion) -> ApiResult<()> {
    let mut v = Validator::new();
    v.required("title", &version.title, 200);
    if !matches!(version.blocks.0, Value::Object(_) | Value::Array(_)) {
        v.add("blocks", "must be a JSON object or array");
    }
    v.finish()
}

/// Store the next version of `kind`, optionally making it the live one in the same transaction.
pub async fn create_version(
    pool: &SqlitePool,
    actor: &Actor,
    kind: ContentKind,
    input: CreateContentInput,
) -> ApiResult<ContentVersion> {
    let timestamp = now();
    let mut version = ContentVersion {
        id: cuid2::create_id(),
        kind,
        title: input.title.trim().to_string(),
        blocks: Json(input.blocks),
        version: 0,
        is_active: false,
        created_by: actor.id.clone(),
        created_at: timestamp,
        updated_at: timestamp,
    };
    validate(&version)?;

    let mut tx = pool.begin().await?;
    version.version = next_version_number(&mut tx, kind).await?;
    insert_version(&mut tx, &version).await?;
    let mut recorded = vec![
        audit::record(
            &mut tx,
            actor,
            AuditEntry::new(AuditAction::Create, EntityType::Content, &version.id)
                .summary(format!("created {} v{}", kind.segment(), version.version)),
        )
        .await?,
    ];
    if input.activate {
        set_active(&mut tx, kind, &version.id).await?;
        version.is_active = true;
        recorded.push(
            audit::record(
                &mut tx,
                actor,
                AuditEntry::new(AuditAction::Activate, EntityType::Content, &version.id)
                    .summary(format!("activated {} v{}", kind.segment(), version.version)),
            )
            .await?,
        );
    }
    tx.commit().await?;
    recorded.into_iter().for_each(Recorded::committed);

    Ok(version)
}

pub async fn update_version(
    pool: &SqlitePool,
    actor: &Actor,
    kind: ContentKind,
    id: &str,
    input: UpdateContentInput,
) -> ApiResult<ContentVersion> {
    let before = fetch_version(pool, kind, id)
        .await?
        .ok_or(ApiError::NotFound("content version"))?;

    let mut version = before.clone();
    if let Some(title) = input.title {
        version.title = title.trim().to_string();
    }
    if let Some(blocks) = input.blocks {
        version.blocks = Json(blocks);
    }
    validate(&version)?;
    version.updated_at = now();

    let mut tx = pool.begin().await?;
    update_row(&mut tx, &version).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Update, EntityType::Content, &version.id)
            .changes(diff(&before, &version)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(version)
}

pub async fn activate_version(
    pool: &SqlitePool,
    actor: &Actor,
    kind: ContentKind,
    id: &str,
) -> ApiResult<ContentVersion> {
    let existing = fetch_version(pool, kind, id)
        .await?
        .ok_or(ApiError::NotFound("content version"))?;

    let mut tx = pool.begin().await?;
    if set_active(&mut tx, kind, id).await? == 0 {
        return Err(ApiError::NotFound("content version"));
    }
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Activate, EntityType::Content, id)
            .summary(format!("activated {} v{}", kind.segment(), existing.version)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    fetch_version(pool, kind, id)
        .await?
        .ok_or(ApiError::NotFound("content version"))
}

/// The live version cannot be deleted; activate another one first.
pub async fn delete_version(
    pool: &SqlitePool,
    actor: &Actor,
    kind: ContentKind,
    id: &str,
) -> ApiResult<()> {
    let existing = fetch_version(pool, kind, id)
        .await?
        .ok_or(ApiError::NotFound("content version"))?;

    // The active check happens in the DELETE itself so a concurrent activation cannot slip in.
    let mut tx = pool.begin().await?;
    if delete_inactive_version(&mut tx, kind, id).await? == 0 {
        return Err(ApiError::conflict("cannot delete the active version"));
    }
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Delete, EntityType::Content, id)
            .summary(format!("deleted {} v{}", kind.segment(), existing.version)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::content::db::fetch_active;
    use crate::test_helpers::{create_test_pool, editor_actor};

    fn input(title: &str, activate: bool) -> CreateContentInput {
        CreateContentInput {
            title: title.to_string(),
            blocks: json!([{ "type": "hero", "heading": title }]),
            activate,
        }
    }

    async fn active_count(pool: &SqlitePool, kind: ContentKind) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM content_versions WHERE kind = ? AND is_active = 1")
            .bind(kind)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_versions_increment_per_kind() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let first = create_version(&pool, &actor, ContentKind::Homepage, input("Home", false))
            .await
            .unwrap();
        let second = create_version(&pool, &actor, ContentKind::Homepage, input("Home 2", false))
            .await
            .unwrap();
        let about = create_version(&pool, &actor, ContentKind::AboutUs, input("About", false))
            .await
            .unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(about.version, 1);
    }

    #[tokio::test]
    async fn test_single_active_version() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let kind = ContentKind::Homepage;
        let first = create_version(&pool, &actor, kind, input("Home", true)).await.unwrap();
        assert!(first.is_active);
        let second = create_version(&pool, &actor, kind, input("Home 2", false)).await.unwrap();
        assert_eq!(fetch_active(&pool, kind).await.unwrap().unwrap().id, first.id);

        let activated = activate_version(&pool, &actor, kind, &second.id).await.unwrap();
        assert!(activated.is_active);
        assert_eq!(active_count(&pool, kind).await, 1);
        assert_eq!(fetch_active(&pool, kind).await.unwrap().unwrap().id, second.id);

        // Re-activating the live version is a no-op.
        activate_version(&pool, &actor, kind, &second.id).await.unwrap();
        assert_eq!(active_count(&pool, kind).await, 1);
    }

    #[tokio::test]
    async fn test_activate_wrong_kind_is_not_found() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let home = create_version(&pool, &actor, ContentKind::Homepage, input("Home", true))
            .await
            .unwrap();
        let err = activate_version(&pool, &actor, ContentKind::AboutUs, &home.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(active_count(&pool, ContentKind::Homepage).await, 1);
    }

    #[tokio::test]
    async fn test_active_version_cannot_be_deleted() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let kind = ContentKind::AboutUs;
        let live = create_version(&pool, &actor, kind, input("About", true)).await.unwrap();
        let old = create_version(&pool, &actor, kind, input("Draft", false)).await.unwrap();

        let err = delete_version(&pool, &actor, kind, &live.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        delete_version(&pool, &actor, kind, &old.id).await.unwrap();
        assert_eq!(fetch_active(&pool, kind).await.unwrap().unwrap().id, live.id);
    }

    #[tokio::test]
    async fn test_delete_guard_is_part_of_the_statement() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let kind = ContentKind::Homepage;
        let version = create_version(&pool, &actor, kind, input("Spring", false)).await.unwrap();

        // Activated after the caller looked it up, before the delete ran.
        activate_version(&pool, &actor, kind, &version.id).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let deleted = delete_inactive_version(&mut conn, kind, &version.id).await.unwrap();
        assert_eq!(deleted, 0);
        drop(conn);

        assert!(fetch_active(&pool, kind).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_blocks_must_be_structured() {
        let pool = create_test_pool().await.unwrap();
        let mut bad = input("Home", false);
        bad.blocks = json!("just a string");
        let err = create_version(&pool, &editor_actor(), ContentKind::Homepage, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
