use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::common::PublishStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Moderate,
    Challenging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub destination_id: Option<String>,
    pub category_id: Option<String>,
    pub duration_days: i64,
    pub price_cents: i64,
    pub currency: String,
    pub max_group_size: Option<i64>,
    pub difficulty: Difficulty,
    pub itinerary: Json<Vec<ItineraryDay>>,
    pub inclusions: Json<Vec<String>>,
    pub exclusions: Json<Vec<String>>,
    pub featured_image: Option<String>,
    pub featured: bool,
    pub status: PublishStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTourInput {
    pub title: String,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub destination_id: Option<String>,
    pub category_id: Option<String>,
    pub duration_days: i64,
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub max_group_size: Option<i64>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub itinerary: Vec<ItineraryDay>,
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: PublishStatus,
}

impl Default for CreateTourInput {
    fn default() -> Self {
        Self {
            title: String::new(),
            slug: None,
            summary: None,
            description: None,
            destination_id: None,
            category_id: None,
            duration_days: 1,
            price_cents: 0,
            currency: default_currency(),
            max_group_size: None,
            difficulty: Difficulty::default(),
            itinerary: Vec::new(),
            inclusions: Vec::new(),
            exclusions: Vec::new(),
            featured_image: None,
            featured: false,
            status: PublishStatus::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTourInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub destination_id: Option<String>,
    pub category_id: Option<String>,
    pub duration_days: Option<i64>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub max_group_size: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub itinerary: Option<Vec<ItineraryDay>>,
    pub inclusions: Option<Vec<String>>,
    pub exclusions: Option<Vec<String>>,
    pub featured_image: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<PublishStatus>,
}

/// `minPrice` and `maxPrice` are in cents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourFilter {
    pub status: Option<PublishStatus>,
    pub destination: Option<String>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}
