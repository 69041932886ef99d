use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::common::PublishStatus;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub content_html: String,
    pub reading_minutes: i64,
    pub author_id: Option<String>,
    pub category_id: Option<String>,
    pub tags: Json<Vec<String>>,
    pub featured_image: Option<String>,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogPostInput {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub category_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogPostInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub featured_image: Option<String>,
    pub status: Option<PublishStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogFilter {
    pub status: Option<PublishStatus>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
}
