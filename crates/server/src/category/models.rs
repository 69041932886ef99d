use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which resource a category groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CategoryKind {
    Destination,
    Tour,
    Blog,
    Event,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Destination => "destination",
            CategoryKind::Tour => "tour",
            CategoryKind::Blog => "blog",
            CategoryKind::Event => "event",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub kind: CategoryKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub kind: CategoryKind,
    pub description: Option<String>,
}

/// Absent fields are left unchanged; an empty `description` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub kind: Option<CategoryKind>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryFilter {
    pub kind: Option<CategoryKind>,
    pub search: Option<String>,
}
