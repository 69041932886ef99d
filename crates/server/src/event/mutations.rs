use chrono::SubsecRound;
use sqlx::SqlitePool;

use super::db::{delete_event as delete_row, fetch_event_by_id, insert_event, update_event as update_row};
use super::models::{CreateEventInput, Event, UpdateEventInput};
use crate::audit::{self, AuditAction, AuditEntry, EntityType, diff};
use crate::auth::Actor;
use crate::category::{CategoryKind, require_category};
use crate::common::now;
use crate::destination::require_destination;
use crate::error::{ApiError, ApiResult};
use crate::validation::{SlugTable, Validator, clean_optional, resolve_slug};

fn validate(event: &mut Event, slug: Option<&str>) -> ApiResult<()> {
    let mut v = Validator::new();
    v.slug("slug", slug);
    v.required("title", &event.title, 200);
    v.optional_max_len("venue", event.venue.as_deref(), 200);
    if let Some(ends_at) = event.ends_at {
        if ends_at < event.starts_at {
            v.add("endsAt", "must not be before startsAt");
        }
    }
    event.ticket_url = v.url("ticketUrl", event.ticket_url.as_deref());
    event.featured_image = v.asset("featuredImage", event.featured_image.as_deref());
    v.finish()
}

async fn check_references(pool: &SqlitePool, event: &Event) -> ApiResult<()> {
    require_destination(pool, event.destination_id.as_deref()).await?;
    require_category(pool, event.category_id.as_deref(), CategoryKind::Event).await
}

pub async fn create_event(pool: &SqlitePool, actor: &Actor, input: CreateEventInput) -> ApiResult<Event> {
    let timestamp = now();
    let mut event = Event {
        id: cuid2::create_id(),
        title: input.title.trim().to_string(),
        slug: String::new(),
        description: clean_optional(input.description),
        destination_id: clean_optional(input.destination_id),
        category_id: clean_optional(input.category_id),
        venue: clean_optional(input.venue),
        starts_at: input.starts_at.trunc_subsecs(0),
        ends_at: input.ends_at.map(|t| t.trunc_subsecs(0)),
        ticket_url: clean_optional(input.ticket_url),
        featured_image: clean_optional(input.featured_image),
        status: input.status,
        created_at: timestamp,
        updated_at: timestamp,
    };
    validate(&mut event, input.slug.as_deref())?;
    check_references(pool, &event).await?;

    event.slug = resolve_slug(pool, SlugTable::Events, input.slug.as_deref(), &event.title, None).await?;

    let mut tx = pool.begin().await?;
    insert_event(&mut tx, &event).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Create, EntityType::Event, &event.id)
            .summary(format!("created event {}", event.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(event)
}

pub async fn update_event(
    pool: &SqlitePool,
    actor: &Actor,
    id: &str,
    input: UpdateEventInput,
) -> ApiResult<Event> {
    let before = fetch_event_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("event"))?;

    let mut event = before.clone();
    if let Some(title) = input.title {
        event.title = title.trim().to_string();
    }
    if input.description.is_some() {
        event.description = clean_optional(input.description);
    }
    if input.destination_id.is_some() {
        event.destination_id = clean_optional(input.destination_id);
    }
    if input.category_id.is_some() {
        event.category_id = clean_optional(input.category_id);
    }
    if input.venue.is_some() {
        event.venue = clean_optional(input.venue);
    }
    if let Some(starts_at) = input.starts_at {
        event.starts_at = starts_at.trunc_subsecs(0);
    }
    if input.clear_ends_at {
        event.ends_at = None;
    } else if let Some(ends_at) = input.ends_at {
        event.ends_at = Some(ends_at.trunc_subsecs(0));
    }
    if input.ticket_url.is_some() {
        event.ticket_url = clean_optional(input.ticket_url);
    }
    if input.featured_image.is_some() {
        event.featured_image = clean_optional(input.featured_image);
    }
    if let Some(status) = input.status {
        event.status = status;
    }
    validate(&mut event, input.slug.as_deref())?;
    if event.destination_id != before.destination_id || event.category_id != before.category_id {
        check_references(pool, &event).await?;
    }

    if input.slug.is_some() || event.title != before.title {
        event.slug = resolve_slug(
            pool,
            SlugTable::Events,
            input.slug.as_deref(),
            &event.title,
            Some(&event.id),
        )
        .await?;
    }
    event.updated_at = now();

    let mut tx = pool.begin().await?;
    update_row(&mut tx, &event).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Update, EntityType::Event, &event.id)
            .changes(diff(&before, &event)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(event)
}

pub async fn delete_event(pool: &SqlitePool, actor: &Actor, id: &str) -> ApiResult<()> {
    let existing = fetch_event_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("event"))?;

    let mut tx = pool.begin().await?;
    delete_row(&mut tx, id).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Delete, EntityType::Event, id)
            .summary(format!("deleted event {}", existing.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::common::{PublishStatus, Visibility};
    use crate::event::db::list_events;
    use crate::event::models::EventFilter;
    use crate::pagination::Page;
    use crate::test_helpers::{create_test_pool, editor_actor};

    fn input(title: &str, starts_in_days: i64) -> CreateEventInput {
        CreateEventInput {
            title: title.to_string(),
            slug: None,
            description: None,
            destination_id: None,
            category_id: None,
            venue: None,
            starts_at: Utc::now() + Duration::days(starts_in_days),
            ends_at: None,
            ticket_url: None,
            featured_image: None,
            status: PublishStatus::Published,
        }
    }

    #[tokio::test]
    async fn test_end_before_start_is_rejected() {
        let pool = create_test_pool().await.unwrap();
        let mut create = input("Nyepi", 10);
        create.ends_at = Some(create.starts_at - Duration::hours(1));
        create.ticket_url = Some("ftp://tickets.example.com".into());

        let err = create_event(&pool, &editor_actor(), create).await.unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["endsAt", "ticketUrl"]);
    }

    #[tokio::test]
    async fn test_upcoming_filter_uses_end_date() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();

        create_event(&pool, &actor, input("Past Festival", -30)).await.unwrap();
        let mut running = input("Month Long Fair", -3);
        running.ends_at = Some(Utc::now() + Duration::days(3));
        create_event(&pool, &actor, running).await.unwrap();
        create_event(&pool, &actor, input("Kite Festival", 20)).await.unwrap();

        let filter = EventFilter {
            upcoming: Some(true),
            ..Default::default()
        };
        let (events, total) =
            list_events(&pool, &filter, Visibility::Public, Page { page: 1, limit: 10 })
                .await
                .unwrap();
        assert_eq!(total, 2);
        assert_eq!(events[0].title, "Month Long Fair");
        assert_eq!(events[1].title, "Kite Festival");
    }

    #[tokio::test]
    async fn test_clear_ends_at() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let mut create = input("Full Moon Party", 5);
        create.ends_at = Some(create.starts_at + Duration::hours(8));
        let created = create_event(&pool, &actor, create).await.unwrap();
        assert!(created.ends_at.is_some());

        let updated = update_event(
            &pool,
            &actor,
            &created.id,
            UpdateEventInput {
                clear_ends_at: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.ends_at, None);
    }
}
