use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Activate,
    Upload,
    Login,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Activate => "activate",
            AuditAction::Upload => "upload",
            AuditAction::Login => "login",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Category,
    Destination,
    Tour,
    BlogPost,
    Event,
    Media,
    Content,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Category => "category",
            EntityType::Destination => "destination",
            EntityType::Tour => "tour",
            EntityType::BlogPost => "blog_post",
            EntityType::Event => "event",
            EntityType::Media => "media",
            EntityType::Content => "content",
        }
    }
}

/// A row of the append-only audit trail.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub actor_id: Option<String>,
    pub actor_label: String,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub summary: Option<String>,
    pub changes: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

/// What to append for one mutation.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: &'a str,
    pub summary: Option<String>,
    pub changes: Option<Value>,
}

impl<'a> AuditEntry<'a> {
    pub fn new(action: AuditAction, entity_type: EntityType, entity_id: &'a str) -> Self {
        Self {
            action,
            entity_type,
            entity_id,
            summary: None,
            changes: None,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn changes(mut self, changes: Value) -> Self {
        self.changes = Some(changes);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
}
