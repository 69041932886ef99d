use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: String,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub url: String,
    pub alt_text: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A file pulled out of a multipart request, not yet validated.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMediaInput {
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFilter {
    pub mime_prefix: Option<String>,
    pub search: Option<String>,
}
