//! Types shared by the publishable resources.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::pagination::Page;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

/// Who is reading: anonymous visitors only ever see published rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Staff,
}

impl Visibility {
    /// Push the status predicate for this audience.
    pub fn push_status_filter<'a>(
        self,
        qb: &mut QueryBuilder<'a, Sqlite>,
        requested: Option<PublishStatus>,
    ) {
        let status = match self {
            Visibility::Public => Some(PublishStatus::Published),
            Visibility::Staff => requested,
        };
        if let Some(status) = status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
    }

    pub fn can_see(self, status: PublishStatus) -> bool {
        self == Visibility::Staff || status == PublishStatus::Published
    }
}

/// Current time at second precision so stored timestamps sort lexically.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

fn escape_like(term: &str) -> String {
    term.trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// `%term%` pattern for LIKE searches.
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// `term%` pattern for prefix matches.
pub fn like_prefix(term: &str) -> String {
    format!("{}%", escape_like(term))
}

/// Push `AND (col LIKE ? ESCAPE '\' OR ...)` for a free-text search.
pub fn push_search<'a>(qb: &mut QueryBuilder<'a, Sqlite>, columns: &[&str], term: Option<&str>) {
    let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    let pattern = like_pattern(term);
    qb.push(" AND (");
    for (idx, column) in columns.iter().enumerate() {
        if idx > 0 {
            qb.push(" OR ");
        }
        qb.push(format!("{column} LIKE "));
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\'");
    }
    qb.push(")");
}

/// Run a filtered count plus one page of rows from `table`.
///
/// `table`, `columns` and `order_by` are compile-time constants; only the
/// values bound inside `filters` come from the request.
pub async fn fetch_page<'a, T, F>(
    pool: &SqlitePool,
    table: &str,
    columns: &str,
    order_by: &str,
    page: Page,
    filters: F,
) -> Result<(Vec<T>, i64), sqlx::Error>
where
    T: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    F: Fn(&mut QueryBuilder<'a, Sqlite>),
{
    let mut count = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {table} WHERE 1 = 1"));
    filters(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select =
        QueryBuilder::<Sqlite>::new(format!("SELECT {columns} FROM {table} WHERE 1 = 1"));
    filters(&mut select);
    select.push(format!(" ORDER BY {order_by} LIMIT "));
    select.push_bind(page.limit());
    select.push(" OFFSET ");
    select.push_bind(page.offset());
    let items = select.build_query_as::<T>().fetch_all(pool).await?;

    Ok((items, total))
}
