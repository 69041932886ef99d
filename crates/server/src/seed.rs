//! First-run sample data for a fresh install.

use anyhow::Result;
use chrono::Duration;
use serde_json::json;
use sqlx::SqlitePool;

use crate::auth::Actor;
use crate::blog::{CreateBlogPostInput, create_post};
use crate::category::db::count_categories;
use crate::category::mutations::create_category;
use crate::category::{CategoryKind, CreateCategoryInput};
use crate::common::{PublishStatus, now};
use crate::content::{ContentKind, CreateContentInput, create_version};
use crate::destination::{CreateDestinationInput, create_destination};
use crate::event::{CreateEventInput, create_event};
use crate::tour::{CreateTourInput, Difficulty, ItineraryDay, create_tour};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub destinations: usize,
    pub tours: usize,
    pub events: usize,
    pub posts: usize,
    pub content_versions: usize,
}

const DEFAULT_CATEGORIES: &[(&str, CategoryKind, &str)] = &[
    ("Beaches", CategoryKind::Destination, "Coastlines, islands and reefs"),
    ("Mountains", CategoryKind::Destination, "Highlands, volcanoes and trails"),
    ("Adventure", CategoryKind::Tour, "Active trips for the energetic"),
    ("Culture", CategoryKind::Tour, "Temples, crafts and food"),
    ("Travel Tips", CategoryKind::Blog, "Practical advice before you go"),
    ("Festivals", CategoryKind::Event, "Celebrations worth planning around"),
];

/// Insert sample content. Does nothing when categories already exist.
pub async fn seed(pool: &SqlitePool) -> Result<Option<SeedReport>> {
    if count_categories(pool).await? > 0 {
        tracing::info!("database already has categories, skipping seed");
        return Ok(None);
    }

    let actor = Actor::system();
    let mut report = SeedReport::default();

    let mut category_ids = Vec::new();
    for (name, kind, description) in DEFAULT_CATEGORIES {
        let category = create_category(
            pool,
            &actor,
            CreateCategoryInput {
                name: name.to_string(),
                slug: None,
                kind: *kind,
                description: Some(description.to_string()),
            },
        )
        .await?;
        category_ids.push(category.id);
        report.categories += 1;
    }

    let bali = create_destination(
        pool,
        &actor,
        CreateDestinationInput {
            name: "Bali".into(),
            summary: Some("Temples, rice terraces and surf beaches".into()),
            region: Some("Lesser Sunda Islands".into()),
            country: "Indonesia".into(),
            latitude: Some(-8.3405),
            longitude: Some(115.092),
            highlights: vec!["Uluwatu Temple".into(), "Tegallalang rice terraces".into()],
            category_id: Some(category_ids[0].clone()),
            featured: true,
            status: PublishStatus::Published,
            ..Default::default()
        },
    )
    .await?;
    let kyoto = create_destination(
        pool,
        &actor,
        CreateDestinationInput {
            name: "Kyoto".into(),
            summary: Some("Shrines, gardens and old wooden streets".into()),
            country: "Japan".into(),
            latitude: Some(35.0116),
            longitude: Some(135.7681),
            highlights: vec!["Fushimi Inari".into(), "Arashiyama bamboo grove".into()],
            category_id: Some(category_ids[1].clone()),
            status: PublishStatus::Published,
            ..Default::default()
        },
    )
    .await?;
    report.destinations += 2;

    create_tour(
        pool,
        &actor,
        CreateTourInput {
            title: "Bali Temple Trail".into(),
            summary: Some("Four days across the island's sacred sites".into()),
            destination_id: Some(bali.id.clone()),
            category_id: Some(category_ids[3].clone()),
            duration_days: 4,
            price_cents: 48_000,
            max_group_size: Some(12),
            difficulty: Difficulty::Moderate,
            itinerary: vec![
                ItineraryDay {
                    day: 1,
                    title: "Arrival in Ubud".into(),
                    description: None,
                },
                ItineraryDay {
                    day: 2,
                    title: "Tirta Empul and Gunung Kawi".into(),
                    description: None,
                },
                ItineraryDay {
                    day: 4,
                    title: "Uluwatu at sunset".into(),
                    description: Some("Kecak dance on the cliffs".into()),
                },
            ],
            inclusions: vec!["Guide".into(), "Temple entry fees".into()],
            exclusions: vec!["Flights".into()],
            featured: true,
            status: PublishStatus::Published,
            ..Default::default()
        },
    )
    .await?;
    report.tours += 1;

    let starts_at = now() + Duration::days(30);
    create_event(
        pool,
        &actor,
        CreateEventInput {
            title: "Kyoto Lantern Festival".into(),
            slug: None,
            description: Some("An evening of lanterns along the Higashiyama paths".into()),
            destination_id: Some(kyoto.id.clone()),
            category_id: Some(category_ids[5].clone()),
            venue: Some("Higashiyama".into()),
            starts_at,
            ends_at: Some(starts_at + Duration::days(10)),
            ticket_url: None,
            featured_image: None,
            status: PublishStatus::Published,
        },
    )
    .await?;
    report.events += 1;

    create_post(
        pool,
        &actor,
        CreateBlogPostInput {
            title: "Ten Tips for Your First Trip to Bali".into(),
            excerpt: Some("What we wish we had known before landing in Denpasar.".into()),
            content: "## Getting around\n\nHire a driver for day trips.\n\n\
                      ## Temples\n\nCarry a sarong; most temples require one."
                .into(),
            category_id: Some(category_ids[4].clone()),
            tags: vec!["bali".into(), "tips".into()],
            status: PublishStatus::Published,
            ..Default::default()
        },
    )
    .await?;
    report.posts += 1;

    create_version(
        pool,
        &actor,
        ContentKind::Homepage,
        CreateContentInput {
            title: "Homepage".into(),
            blocks: json!([
                { "type": "hero", "heading": "Find your next journey", "image": null },
                { "type": "featuredDestinations", "limit": 6 },
                { "type": "featuredTours", "limit": 3 }
            ]),
            activate: true,
        },
    )
    .await?;
    create_version(
        pool,
        &actor,
        ContentKind::AboutUs,
        CreateContentInput {
            title: "About us".into(),
            blocks: json!({
                "intro": "We are a small team of travellers who plan trips we would take ourselves.",
                "sections": []
            }),
            activate: true,
        },
    )
    .await?;
    report.content_versions += 2;

    tracing::info!(?report, "seeded sample content");
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::db::fetch_active;
    use crate::test_helpers::create_test_pool;

    #[tokio::test]
    async fn test_seed_runs_once() {
        let pool = create_test_pool().await.unwrap();

        let report = seed(&pool).await.unwrap().expect("first run seeds");
        assert_eq!(report.categories, DEFAULT_CATEGORIES.len());
        assert_eq!(report.destinations, 2);
        assert!(fetch_active(&pool, ContentKind::Homepage).await.unwrap().is_some());
        assert!(fetch_active(&pool, ContentKind::AboutUs).await.unwrap().is_some());

        assert!(seed(&pool).await.unwrap().is_none());

        let audited: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs WHERE actor_label = 'system'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(audited > 0);
    }
}
