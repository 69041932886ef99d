use serde::Deserialize;
use sqlx::SqlitePool;

use super::password::{dummy_hash, hash_password, verify_password};
use super::{Actor, Role, User};
use crate::audit::{self, AuditAction, AuditEntry, EntityType};
use crate::common::{fetch_page, now};
use crate::error::{ApiError, ApiResult};
use crate::pagination::Page;
use crate::validation::Validator;

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, updated_at";
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

pub async fn fetch_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    sqlx::query_as::<_, User>(&sql)
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
}

pub async fn list_users(pool: &SqlitePool, page: Page) -> Result<(Vec<User>, i64), sqlx::Error> {
    fetch_page(pool, "users", USER_COLUMNS, "email ASC", page, |_| {}).await
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub async fn create_user(
    pool: &SqlitePool,
    actor: &Actor,
    input: CreateUserInput,
    password_iterations: u32,
) -> ApiResult<User> {
    let mut v = Validator::new();
    v.email("email", &input.email);
    v.required("name", &input.name, 120);
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        v.add(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }
    v.finish()?;

    let email = normalize_email(&input.email);
    if fetch_user_by_email(pool, &email).await?.is_some() {
        return Err(ApiError::conflict("a user with this email already exists"));
    }

    let password_hash = hash_password(&input.password, password_iterations)?;
    let timestamp = now();
    let user = User {
        id: cuid2::create_id(),
        email,
        name: input.name.trim().to_string(),
        password_hash,
        role: input.role,
        created_at: timestamp,
        updated_at: timestamp,
    };

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut *tx)
    .await?;

    let recorded = audit::record(
        &mut tx,
        actor,
        AuditEntry::new(AuditAction::Create, EntityType::User, &user.id)
            .summary(format!("created {} {}", user.role.as_str(), user.email)),
    )
    .await?;
    tx.commit().await?;
    recorded.committed();

    Ok(user)
}

/// Check credentials. Unknown email and wrong password are indistinguishable
/// to the caller, in body and in timing: an unknown email is checked against
/// a dummy hash of the configured cost. Every attempt is written to the audit log.
pub async fn authenticate(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    iterations: u32,
) -> ApiResult<User> {
    let user = fetch_user_by_email(pool, email).await?;

    let verified = match &user {
        Some(user) => verify_password(password, &user.password_hash).unwrap_or_else(|err| {
            tracing::error!(user = %user.id, error = %err, "stored password hash is unreadable");
            false
        }),
        None => {
            let _ = verify_password(password, &dummy_hash(iterations));
            false
        }
    };

    let outcome = if verified { "success" } else { "failure" };
    metrics::counter!("cms_logins_total", "outcome" => outcome).increment(1);

    let (actor, entity_id) = match &user {
        Some(user) => (
            Actor {
                id: Some(user.id.clone()),
                label: user.email.clone(),
                role: user.role,
            },
            user.id.clone(),
        ),
        None => (
            Actor {
                id: None,
                label: normalize_email(email),
                role: Role::Editor,
            },
            String::new(),
        ),
    };

    let mut conn = pool.acquire().await?;
    audit::record(
        &mut conn,
        &actor,
        AuditEntry::new(AuditAction::Login, EntityType::User, &entity_id).summary(outcome),
    )
    .await?
    .committed();

    match user {
        Some(user) if verified => Ok(user),
        _ => {
            tracing::warn!(email = %normalize_email(email), "failed login attempt");
            Err(ApiError::Unauthorized("invalid email or password".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_pool;

    fn input(email: &str) -> CreateUserInput {
        CreateUserInput {
            email: email.to_string(),
            name: "Ana Editor".to_string(),
            password: "long-enough".to_string(),
            role: Role::Editor,
        }
    }

    #[tokio::test]
    async fn test_create_user_normalizes_email_and_audits() {
        let pool = create_test_pool().await.unwrap();
        let user = create_user(&pool, &Actor::system(), input("  Ana@Visit.Example "), 100)
            .await
            .unwrap();
        assert_eq!(user.email, "ana@visit.example");

        let fetched = fetch_user_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Ana Editor");

        let actions: Vec<String> =
            sqlx::query_scalar("SELECT action FROM audit_logs WHERE entity_id = ?")
                .bind(&user.id)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(actions, vec!["create"]);
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email() {
        let pool = create_test_pool().await.unwrap();
        create_user(&pool, &Actor::system(), input("dup@visit.example"), 100)
            .await
            .unwrap();
        let err = create_user(&pool, &Actor::system(), input("DUP@visit.example"), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let pool = create_test_pool().await.unwrap();
        let bad = CreateUserInput {
            email: "nope".into(),
            name: " ".into(),
            password: "short".into(),
            role: Role::Admin,
        };
        match create_user(&pool, &Actor::system(), bad, 100).await {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "name", "password"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate() {
        let pool = create_test_pool().await.unwrap();
        create_user(&pool, &Actor::system(), input("login@visit.example"), 100)
            .await
            .unwrap();

        let user = authenticate(&pool, "LOGIN@visit.example", "long-enough", 1_000)
            .await
            .unwrap();
        assert_eq!(user.email, "login@visit.example");

        let wrong = authenticate(&pool, "login@visit.example", "nope", 1_000).await;
        assert!(matches!(wrong, Err(ApiError::Unauthorized(_))));

        let unknown = authenticate(&pool, "ghost@visit.example", "long-enough", 1_000).await;
        match unknown {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "invalid email or password"),
            other => panic!("unexpected {other:?}"),
        }

        let logins: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs WHERE action = 'login'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(logins, 3);
    }
}
