use sqlx::SqlitePool;
use sqlx::types::Json;

use super::db::{
    delete_destination as delete_row, fetch_destination_by_id, insert_destination,
    update_destination as update_row,
};
use super::models::{CreateDestinationInput, Destination, UpdateDestinationInput};
use crate::audit::{self, AuditAction, AuditEntry, EntityType, diff};
use crate::auth::Actor;
use crate::category::{CategoryKind, require_category};
use crate::common::now;
use crate::error::{ApiError, ApiResult};
use crate::validation::{SlugTable, Validator, clean_optional, resolve_slug};

/// Validate and normalize asset references in place.
fn validate(destination: &mut Destination, slug: Option<&str>) -> ApiResult<()> {
    let mut v = Validator::new();
    v.slug("slug", slug);
    v.required("name", &destination.name, 120);
    v.required("country", &destination.country, 80);
    v.optional_max_len("summary", destination.summary.as_deref(), 300);
    v.optional_max_len("region", destination.region.as_deref(), 120);
    v.range_f64("latitude", destination.latitude, -90.0, 90.0);
    v.range_f64("longitude", destination.longitude, -180.0, 180.0);
    destination.featured_image = v.asset("featuredImage", destination.featured_image.as_deref());
    destination.gallery = Json(v.assets("gallery", &destination.gallery));
    v.string_list("highlights", &destination.highlights, 200);
    v.optional_max_len("metaTitle", destination.meta_title.as_deref(), 70);
    v.optional_max_len("metaDescription", destination.meta_description.as_deref(), 160);
    v.finish()
}

pub async fn create_destination(
    pool: &SqlitePool,
    actor: &Actor,
    input: CreateDestinationInput,
) -> ApiResult<Destination> {
    let timestamp = now();
    let mut destination = Destination {
        id: cuid2::create_id(),
        name: input.name.trim().to_string(),
        slug: String::new(),
        summary: clean_optional(input.summary),
        description: clean_optional(input.description),
        region: clean_optional(input.region),
        country: input.country.trim().to_string(),
        latitude: input.latitude,
        longitude: input.longitude,
        featured_image: clean_optional(input.featured_image),
        gallery: Json(input.gallery),
        highlights: Json(input.highlights.iter().map(|h| h.trim().to_string()).collect()),
        category_id: clean_optional(input.category_id),
        featured: input.featured,
        status: input.status,
        meta_title: clean_optional(input.meta_title),
        meta_description: clean_optional(input.meta_description),
        created_at: timestamp,
        updated_at: timestamp,
    };
    validate(&mut destination, input.slug.as_deref())?;
    require_category(pool, destination.category_id.as_deref(), CategoryKind::Destination).await?;

    destination.slug = resolve_slug(
        pool,
        SlugTable::Destinations,
        input.slug.as_deref(),
        &destination.name,
        None,
    )
    .await?;

    let mut tx = pool.begin().await?;
    insert_destination(&mut tx, &destination).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Create, EntityType::Destination, &destination.id)
            .summary(format!("created destination {}", destination.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(destination)
}

pub async fn update_destination(
    pool: &SqlitePool,
    actor: &Actor,
    id: &str,
    input: UpdateDestinationInput,
) -> ApiResult<Destination> {
    let before = fetch_destination_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("destination"))?;

    let mut destination = before.clone();
    if let Some(name) = input.name {
        destination.name = name.trim().to_string();
    }
    if let Some(country) = input.country {
        destination.country = country.trim().to_string();
    }
    if input.summary.is_some() {
        destination.summary = clean_optional(input.summary);
    }
    if input.description.is_some() {
        destination.description = clean_optional(input.description);
    }
    if input.region.is_some() {
        destination.region = clean_optional(input.region);
    }
    if input.latitude.is_some() {
        destination.latitude = input.latitude;
    }
    if input.longitude.is_some() {
        destination.longitude = input.longitude;
    }
    if input.featured_image.is_some() {
        destination.featured_image = clean_optional(input.featured_image);
    }
    if let Some(gallery) = input.gallery {
        destination.gallery = Json(gallery);
    }
    if let Some(highlights) = input.highlights {
        destination.highlights = Json(highlights.iter().map(|h| h.trim().to_string()).collect());
    }
    if input.category_id.is_some() {
        destination.category_id = clean_optional(input.category_id);
    }
    if let Some(featured) = input.featured {
        destination.featured = featured;
    }
    if let Some(status) = input.status {
        destination.status = status;
    }
    if input.meta_title.is_some() {
        destination.meta_title = clean_optional(input.meta_title);
    }
    if input.meta_description.is_some() {
        destination.meta_description = clean_optional(input.meta_description);
    }
    validate(&mut destination, input.slug.as_deref())?;
    if destination.category_id != before.category_id {
        require_category(pool, destination.category_id.as_deref(), CategoryKind::Destination)
            .await?;
    }

    if input.slug.is_some() || destination.name != before.name {
        destination.slug = resolve_slug(
            pool,
            SlugTable::Destinations,
            input.slug.as_deref(),
            &destination.name,
            Some(&destination.id),
        )
        .await?;
    }
    destination.updated_at = now();

    let mut tx = pool.begin().await?;
    update_row(&mut tx, &destination).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Update, EntityType::Destination, &destination.id)
            .changes(diff(&before, &destination)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(destination)
}

/// Tours and events pointing here keep existing with a null destination.
pub async fn delete_destination(pool: &SqlitePool, actor: &Actor, id: &str) -> ApiResult<()> {
    let existing = fetch_destination_by_id(pool, id)
        .await?
        .ok_or(ApiError::NotFound("destination"))?;

    let mut tx = pool.begin().await?;
    delete_row(&mut tx, id).await?;
    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Delete, EntityType::Destination, id)
            .summary(format!("deleted destination {}", existing.slug)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(())
}
