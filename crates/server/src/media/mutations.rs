use sqlx::SqlitePool;

use super::db::{delete_media as delete_row, fetch_media_by_id, insert_media, update_alt_text};
use super::models::{Media, UpdateMediaInput, Upload};
use super::storage::{MediaStorage, stored_name_for};
use crate::audit::{self, AuditAction, AuditEntry, EntityType, diff};
use crate::auth::Actor;
use crate::common::now;
use crate::error::{ApiError, ApiResult};
use crate::validation::{Validator, clean_optional};

const ALT_TEXT_MAX: usize = 300;

fn validate_alt_text(alt_text: Option<&str>) -> ApiResult<()> {
    let mut v = Validator::new();
    v.optional_max_len("altText", alt_text, ALT_TEXT_MAX);
    v.finish()
}

/// Write the file, then record it. The file is removed again if the row cannot be stored.
pub async fn upload_media(
    pool: &SqlitePool,
    storage: &MediaStorage,
    actor: &Actor,
    upload: Upload,
) -> ApiResult<Media> {
    storage.check_mime(&upload.mime_type)?;
    storage.check_size(upload.bytes.len())?;
    let alt_text = clean_optional(upload.alt_text);
    validate_alt_text(alt_text.as_deref())?;

    let stored_name = stored_name_for(&upload.original_name, &upload.mime_type);
    let media = Media {
        id: cuid2::create_id(),
        url: storage.public_url(&stored_name),
        original_name: upload.original_name,
        stored_name,
        mime_type: upload.mime_type,
        size_bytes: upload.bytes.len() as i64,
        alt_text,
        uploaded_by: actor.id.clone(),
        created_at: now(),
    };

    storage.write(&media.stored_name, &upload.bytes).await?;

    let stored = async {
        let mut tx = pool.begin().await?;
        insert_media(&mut tx, &media).await?;
        let recorded = audit::record(
            &mut tx,
            actor,
            AuditEntry::new(AuditAction::Upload, EntityType::Media, &media.id).summary(format!(
                "uploaded {} ({} bytes)",
                media.original_name, media.size_bytes
            )),
        )
        .await?;
        tx.commit().await?;
        recorded.committed();
        Ok::<_, ApiError>(())
    }
    .await;

    if let Err(err) = stored {
        if let Err(cleanup) = storage.remove(&media.stored_name).await {
            tracing::warn!(file = %media.stored_name, error = %cleanup, "failed to remove orphaned upload");
        }
        return Err(err);
    }

    Ok(media)
}

pub async fn update_media(
    pool: &SqlitePool,
    actor: &Actor,
    id: &str,
    input: UpdateMediaInput,
) -> ApiResult<Media> {
    let before = fetch_media_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("media"))?;

    let mut media = before.clone();
    if input.alt_text.is_some() {
        media.alt_text = clean_optional(input.alt_text);
    }
    validate_alt_text(media.alt_text.as_deref())?;

    let mut tx = pool.begin().await?;
    update_alt_text(&mut tx, id, media.alt_text.as_deref()).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Update, EntityType::Media, id).changes(diff(&before, &media)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(media)
}

/// Delete the row first; a file that is already missing only logs a warning.
pub async fn delete_media(
    pool: &SqlitePool,
    storage: &MediaStorage,
    actor: &Actor,
    id: &str,
) -> ApiResult<()> {
    let existing = fetch_media_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("media"))?;

    let mut tx = pool.begin().await?;
    delete_row(&mut tx, id).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Delete, EntityType::Media, id)
            .summary(format!("deleted {}", existing.original_name)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    match storage.remove(&existing.stored_name).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(file = %existing.stored_name, "media file already missing on delete");
        }
        Err(err) => {
            tracing::warn!(file = %existing.stored_name, error = %err, "failed to remove media file");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::config::Uploads;
    use crate::test_helpers::{create_test_pool, editor_actor};

    fn storage(dir: &std::path::Path) -> MediaStorage {
        MediaStorage::new(&Uploads {
            dir: dir.to_path_buf(),
            max_bytes: 16,
            ..Uploads::default()
        })
    }

    fn png(bytes: &'static [u8]) -> Upload {
        Upload {
            original_name: "Beach.PNG".to_string(),
            mime_type: "image/png".to_string(),
            bytes: Bytes::from_static(bytes),
            alt_text: Some(" Sunset ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_row() {
        let pool = create_test_pool().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let media = upload_media(&pool, &storage, &editor_actor(), png(b"\x89PNG....")).await.unwrap();
        assert!(media.stored_name.ends_with(".png"));
        assert_eq!(media.url, format!("/uploads/{}", media.stored_name));
        assert_eq!(media.alt_text.as_deref(), Some("Sunset"));
        assert_eq!(media.size_bytes, 8);
        assert!(dir.path().join(&media.stored_name).exists());

        let action: String =
            sqlx::query_scalar("SELECT action FROM audit_logs WHERE entity_id = ?")
                .bind(&media.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(action, "upload");
    }

    #[tokio::test]
    async fn test_upload_policy_errors() {
        let pool = create_test_pool().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let actor = editor_actor();

        let too_big = upload_media(&pool, &storage, &actor, png(b"0123456789abcdefXYZ")).await;
        assert!(matches!(too_big, Err(ApiError::PayloadTooLarge { limit: 16 })));

        let empty = upload_media(&pool, &storage, &actor, png(b"")).await;
        assert!(matches!(empty, Err(ApiError::BadRequest(_))));

        let mut html = png(b"<html>");
        html.mime_type = "text/html".into();
        let wrong_type = upload_media(&pool, &storage, &actor, html).await;
        assert!(matches!(wrong_type, Err(ApiError::UnsupportedMediaType(_))));

        assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_file() {
        let pool = create_test_pool().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let actor = editor_actor();

        let media = upload_media(&pool, &storage, &actor, png(b"abc")).await.unwrap();
        std::fs::remove_file(dir.path().join(&media.stored_name)).unwrap();

        delete_media(&pool, &storage, &actor, &media.id).await.unwrap();
        assert!(fetch_media_by_id(&pool, &media.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_alt_text() {
        let pool = create_test_pool().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let actor = editor_actor();
        let media = upload_media(&pool, &storage, &actor, png(b"abc")).await.unwrap();

        let cleared = update_media(&pool, &actor, &media.id, UpdateMediaInput { alt_text: Some("".into()) })
            .await
            .unwrap();
        assert_eq!(cleared.alt_text, None);
        let loaded = fetch_media_by_id(&pool, &media.id).await.unwrap().unwrap();
        assert_eq!(loaded.alt_text, None);
    }
}
