use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;

use crate::error::{ApiError, ApiResult};

/// Singleton pages whose body is kept as a series of versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ContentKind {
    Homepage,
    AboutUs,
}

impl ContentKind {
    /// Parse the `{kind}` URL segment.
    pub fn from_segment(segment: &str) -> ApiResult<Self> {
        match segment {
            "homepage" => Ok(ContentKind::Homepage),
            "about-us" | "about_us" => Ok(ContentKind::AboutUs),
            _ => Err(ApiError::NotFound("content kind")),
        }
    }

    pub fn segment(self) -> &'static str {
        match self {
            ContentKind::Homepage => "homepage",
            ContentKind::AboutUs => "about-us",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContentVersion {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub blocks: Json<Value>,
    pub version: i64,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentInput {
    pub title: String,
    pub blocks: Value,
    #[serde(default)]
    pub activate: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentInput {
    pub title: Option<String>,
    pub blocks: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_segments() {
        assert_eq!(ContentKind::from_segment("about-us").unwrap(), ContentKind::AboutUs);
        assert_eq!(ContentKind::from_segment("homepage").unwrap().segment(), "homepage");
        assert!(ContentKind::from_segment("contact").is_err());
        assert_eq!(serde_json::to_string(&ContentKind::AboutUs).unwrap(), "\"about_us\"");
    }
}
