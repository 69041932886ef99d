use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::common::PublishStatus;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub featured_image: Option<String>,
    pub gallery: Json<Vec<String>>,
    pub highlights: Json<Vec<String>>,
    pub category_id: Option<String>,
    pub featured: bool,
    pub status: PublishStatus,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDestinationInput {
    pub name: String,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub category_id: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: PublishStatus,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// Absent fields are left unchanged; empty strings clear optional text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDestinationInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub featured_image: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub highlights: Option<Vec<String>>,
    pub category_id: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<PublishStatus>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DestinationFilter {
    pub status: Option<PublishStatus>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub country: Option<String>,
    pub search: Option<String>,
}
