use serde::Serialize;
use serde_json::{Map, Value, json};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

use super::models::{AuditAction, AuditEntry, AuditFilter, AuditLog, EntityType};
use crate::auth::Actor;
use crate::common::{fetch_page, now};
use crate::pagination::Page;

const AUDIT_COLUMNS: &str =
    "id, actor_id, actor_label, action, entity_type, entity_id, summary, changes, created_at";

/// An entry written but not yet committed.
#[must_use = "call `committed()` once the transaction has committed"]
#[derive(Debug)]
pub struct Recorded {
    action: AuditAction,
    entity_type: EntityType,
    entity_id: String,
    actor_label: String,
}

impl Recorded {
    /// Count and log the mutation. Rolled-back work never gets here.
    pub fn committed(self) {
        if self.action != AuditAction::Login {
            metrics::counter!(
                "cms_mutations_total",
                "entity" => self.entity_type.as_str(),
                "action" => self.action.as_str()
            )
            .increment(1);
        }

        tracing::info!(
            actor = %self.actor_label,
            action = self.action.as_str(),
            entity = self.entity_type.as_str(),
            id = %self.entity_id,
            "audit"
        );
    }
}

/// Append one entry. Call with the same connection/transaction as the
/// mutation it describes so both commit or neither does, then call
/// [`Recorded::committed`] after the commit.
pub async fn record(
    conn: &mut SqliteConnection,
    actor: &Actor,
    entry: AuditEntry<'_>,
) -> Result<Recorded, sqlx::Error> {
    let id = cuid2::create_id();
    sqlx::query(
        "INSERT INTO audit_logs (id, actor_id, actor_label, action, entity_type, entity_id, summary, changes, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(actor.id.as_deref())
    .bind(&actor.label)
    .bind(entry.action)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(entry.summary.as_deref())
    .bind(entry.changes.map(Json))
    .bind(now())
    .execute(&mut *conn)
    .await?;

    Ok(Recorded {
        action: entry.action,
        entity_type: entry.entity_type,
        entity_id: entry.entity_id.to_string(),
        actor_label: actor.label.clone(),
    })
}

pub async fn list_audit_logs(
    pool: &SqlitePool,
    filter: &AuditFilter,
    page: Page,
) -> Result<(Vec<AuditLog>, i64), sqlx::Error> {
    fetch_page(
        pool,
        "audit_logs",
        AUDIT_COLUMNS,
        "rowid DESC",
        page,
        |qb| {
            if let Some(entity_type) = filter.entity_type {
                qb.push(" AND entity_type = ");
                qb.push_bind(entity_type);
            }
            if let Some(entity_id) = &filter.entity_id {
                qb.push(" AND entity_id = ");
                qb.push_bind(entity_id.clone());
            }
            if let Some(actor_id) = &filter.actor_id {
                qb.push(" AND actor_id = ");
                qb.push_bind(actor_id.clone());
            }
            if let Some(action) = filter.action {
                qb.push(" AND action = ");
                qb.push_bind(action);
            }
        },
    )
    .await
}

/// Top-level fields whose values differ between two serialized records,
/// as `{field: {from, to}}`. `updatedAt` is ignored.
pub fn diff<T: Serialize>(before: &T, after: &T) -> Value {
    let (Ok(Value::Object(before)), Ok(Value::Object(after))) =
        (serde_json::to_value(before), serde_json::to_value(after))
    else {
        return Value::Null;
    };

    let mut changes = Map::new();
    for (key, new_value) in &after {
        if key == "updatedAt" {
            continue;
        }
        let old_value = before.get(key).unwrap_or(&Value::Null);
        if old_value != new_value {
            changes.insert(key.clone(), json!({ "from": old_value, "to": new_value }));
        }
    }
    Value::Object(changes)
}
