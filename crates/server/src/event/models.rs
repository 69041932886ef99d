use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::PublishStatus;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub destination_id: Option<String>,
    pub category_id: Option<String>,
    pub venue: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ticket_url: Option<String>,
    pub featured_image: Option<String>,
    pub status: PublishStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventInput {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub destination_id: Option<String>,
    pub category_id: Option<String>,
    pub venue: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ticket_url: Option<String>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
}

/// `endsAt: null` is indistinguishable from absent; use `clearEndsAt` to drop it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub destination_id: Option<String>,
    pub category_id: Option<String>,
    pub venue: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_ends_at: bool,
    pub ticket_url: Option<String>,
    pub featured_image: Option<String>,
    pub status: Option<PublishStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub status: Option<PublishStatus>,
    pub destination: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub upcoming: Option<bool>,
}
