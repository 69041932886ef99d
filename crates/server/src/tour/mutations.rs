use sqlx::SqlitePool;
use sqlx::types::Json;

use super::db::{delete_tour as delete_row, fetch_tour_by_id, insert_tour, update_tour as update_row};
use super::models::{CreateTourInput, ItineraryDay, Tour, UpdateTourInput};
use crate::audit::{self, AuditAction, AuditEntry, EntityType, diff};
use crate::auth::Actor;
use crate::category::{CategoryKind, require_category};
use crate::common::now;
use crate::destination::require_destination;
use crate::error::{ApiError, ApiResult};
use crate::validation::{SlugTable, Validator, clean_optional, resolve_slug};

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

fn validate_itinerary(v: &mut Validator, days: &[ItineraryDay]) {
    let mut previous = 0;
    for (idx, day) in days.iter().enumerate() {
        if day.day < 1 {
            v.add(&format!("itinerary[{idx}].day"), "must be at least 1");
        } else if day.day <= previous {
            v.add(&format!("itinerary[{idx}].day"), "days must be strictly increasing");
        }
        previous = previous.max(day.day);
        v.required(&format!("itinerary[{idx}].title"), &day.title, 200);
    }
}

fn validate(tour: &mut Tour, slug: Option<&str>) -> ApiResult<()> {
    let mut v = Validator::new();
    v.slug("slug", slug);
    v.required("title", &tour.title, 160);
    v.optional_max_len("summary", tour.summary.as_deref(), 300);
    v.min_i64("durationDays", tour.duration_days, 1);
    v.min_i64("priceCents", tour.price_cents, 0);
    if !is_currency_code(&tour.currency) {
        v.add("currency", "must be a 3-letter ISO code");
    }
    if let Some(size) = tour.max_group_size {
        v.min_i64("maxGroupSize", size, 1);
    }
    validate_itinerary(&mut v, &tour.itinerary);
    v.string_list("inclusions", &tour.inclusions, 200);
    v.string_list("exclusions", &tour.exclusions, 200);
    tour.featured_image = v.asset("featuredImage", tour.featured_image.as_deref());
    v.finish()
}

fn trim_all(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.trim().to_string()).collect()
}

fn clean_itinerary(days: Vec<ItineraryDay>) -> Vec<ItineraryDay> {
    days.into_iter()
        .map(|d| ItineraryDay {
            day: d.day,
            title: d.title.trim().to_string(),
            description: clean_optional(d.description),
        })
        .collect()
}

async fn check_references(pool: &SqlitePool, tour: &Tour) -> ApiResult<()> {
    require_destination(pool, tour.destination_id.as_deref()).await?;
    require_category(pool, tour.category_id.as_deref(), CategoryKind::Tour).await
}

pub async fn create_tour(pool: &SqlitePool, actor: &Actor, input: CreateTourInput) -> ApiResult<Tour> {
    let timestamp = now();
    let mut tour = Tour {
        id: cuid2::create_id(),
        title: input.title.trim().to_string(),
        slug: String::new(),
        summary: clean_optional(input.summary),
        description: clean_optional(input.description),
        destination_id: clean_optional(input.destination_id),
        category_id: clean_optional(input.category_id),
        duration_days: input.duration_days,
        price_cents: input.price_cents,
        currency: input.currency.trim().to_string(),
        max_group_size: input.max_group_size,
        difficulty: input.difficulty,
        itinerary: Json(clean_itinerary(input.itinerary)),
        inclusions: Json(trim_all(input.inclusions)),
        exclusions: Json(trim_all(input.exclusions)),
        featured_image: clean_optional(input.featured_image),
        featured: input.featured,
        status: input.status,
        created_at: timestamp,
        updated_at: timestamp,
    };
    validate(&mut tour, input.slug.as_deref())?;
    check_references(pool, &tour).await?;

    tour.slug = resolve_slug(pool, SlugTable::Tours, input.slug.as_deref(), &tour.title, None).await?;

    let mut tx = pool.begin().await?;
    insert_tour(&mut tx, &tour).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Create, EntityType::Tour, &tour.id)
            .summary(format!("created tour {}", tour.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(tour)
}

pub async fn update_tour(
    pool: &SqlitePool,
    actor: &Actor,
    id: &str,
    input: UpdateTourInput,
) -> ApiResult<Tour> {
    let before = fetch_tour_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("tour"))?;

    let mut tour = before.clone();
    if let Some(title) = input.title {
        tour.title = title.trim().to_string();
    }
    if input.summary.is_some() {
        tour.summary = clean_optional(input.summary);
    }
    if input.description.is_some() {
        tour.description = clean_optional(input.description);
    }
    if input.destination_id.is_some() {
        tour.destination_id = clean_optional(input.destination_id);
    }
    if input.category_id.is_some() {
        tour.category_id = clean_optional(input.category_id);
    }
    if let Some(days) = input.duration_days {
        tour.duration_days = days;
    }
    if let Some(price) = input.price_cents {
        tour.price_cents = price;
    }
    if let Some(currency) = input.currency {
        tour.currency = currency.trim().to_string();
    }
    if input.max_group_size.is_some() {
        tour.max_group_size = input.max_group_size;
    }
    if let Some(difficulty) = input.difficulty {
        tour.difficulty = difficulty;
    }
    if let Some(itinerary) = input.itinerary {
        tour.itinerary = Json(clean_itinerary(itinerary));
    }
    if let Some(inclusions) = input.inclusions {
        tour.inclusions = Json(trim_all(inclusions));
    }
    if let Some(exclusions) = input.exclusions {
        tour.exclusions = Json(trim_all(exclusions));
    }
    if input.featured_image.is_some() {
        tour.featured_image = clean_optional(input.featured_image);
    }
    if let Some(featured) = input.featured {
        tour.featured = featured;
    }
    if let Some(status) = input.status {
        tour.status = status;
    }
    validate(&mut tour, input.slug.as_deref())?;
    if tour.destination_id != before.destination_id || tour.category_id != before.category_id {
        check_references(pool, &tour).await?;
    }

    if input.slug.is_some() || tour.title != before.title {
        tour.slug = resolve_slug(
            pool,
            SlugTable::Tours,
            input.slug.as_deref(),
            &tour.title,
            Some(&tour.id),
        )
        .await?;
    }
    tour.updated_at = now();

    let mut tx = pool.begin().await?;
    update_row(&mut tx, &tour).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Update, EntityType::Tour, &tour.id)
            .changes(diff(&before, &tour)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(tour)
}

pub async fn delete_tour(pool: &SqlitePool, actor: &Actor, id: &str) -> ApiResult<()> {
    let existing = fetch_tour_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("tour"))?;

    let mut tx = pool.begin().await?;
    delete_row(&mut tx, id).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Delete, EntityType::Tour, id)
            .summary(format!("deleted tour {}", existing.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PublishStatus, Visibility};
    use crate::destination::{CreateDestinationInput, create_destination};
    use crate::pagination::Page;
    use crate::test_helpers::{create_test_pool, editor_actor};
    use crate::tour::db::list_tours;
    use crate::tour::models::TourFilter;

    fn input(title: &str, price_cents: i64) -> CreateTourInput {
        CreateTourInput {
            title: title.to_string(),
            duration_days: 3,
            price_cents,
            ..Default::default()
        }
    }

    fn day(day: i64, title: &str) -> ItineraryDay {
        ItineraryDay {
            day,
            title: title.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_currency_code() {
        assert!(is_currency_code("USD"));
        assert!(is_currency_code("EUR"));
        assert!(!is_currency_code("usd"));
        assert!(!is_currency_code("EURO"));
    }

    #[tokio::test]
    async fn test_itinerary_days_must_increase() {
        let pool = create_test_pool().await.unwrap();
        let mut create = input("Volcano Trek", 45_000);
        create.itinerary = vec![day(1, "Arrival"), day(3, "Summit"), day(2, "Descent")];

        let err = create_tour(&pool, &editor_actor(), create).await.unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "itinerary[2].day");
    }

    #[tokio::test]
    async fn test_rejects_negative_price_and_zero_duration() {
        let pool = create_test_pool().await.unwrap();
        let mut create = input("Free Walk", -1);
        create.duration_days = 0;
        create.currency = "us".into();

        let err = create_tour(&pool, &editor_actor(), create).await.unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_destination_is_bad_request() {
        let pool = create_test_pool().await.unwrap();
        let mut create = input("Reef Dive", 12_000);
        create.destination_id = Some("missing".into());

        let err = create_tour(&pool, &editor_actor(), create).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_price_filter_and_destination_link() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let destination = create_destination(
            &pool,
            &actor,
            CreateDestinationInput {
                name: "Bali".into(),
                country: "Indonesia".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut cheap = input("Temple Tour", 5_000);
        cheap.destination_id = Some(destination.id.clone());
        cheap.status = PublishStatus::Published;
        let mut pricey = input("Private Island", 500_000);
        pricey.status = PublishStatus::Published;
        create_tour(&pool, &actor, cheap).await.unwrap();
        create_tour(&pool, &actor, pricey).await.unwrap();

        let filter = TourFilter {
            max_price: Some(10_000),
            ..Default::default()
        };
        let (tours, total) = list_tours(&pool, &filter, Visibility::Public, Page { page: 1, limit: 10 })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(tours[0].title, "Temple Tour");
        assert_eq!(tours[0].destination_id.as_deref(), Some(destination.id.as_str()));
        assert_eq!(tours[0].currency, "USD");
    }

    #[tokio::test]
    async fn test_update_replaces_itinerary() {
        let pool = create_test_pool().await.unwrap();
        let actor = editor_actor();
        let created = create_tour(&pool, &actor, input("Rice Fields", 8_000)).await.unwrap();

        let updated = update_tour(
            &pool,
            &actor,
            &created.id,
            UpdateTourInput {
                itinerary: Some(vec![day(1, " Jatiluwih "), day(2, "Tegallalang")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.itinerary.0.len(), 2);
        assert_eq!(updated.itinerary.0[0].title, "Jatiluwih");
        assert_eq!(updated.slug, "rice-fields");

        let loaded = fetch_tour_by_id(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(loaded.itinerary.0, updated.itinerary.0);
    }
}
