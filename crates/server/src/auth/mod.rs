//! Authentication: password login, JWT bearer tokens, role checks.
//!
//! Tokens are stateless. There is no revocation list and no refresh flow;
//! a token is valid until it expires.

pub mod extractor;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod users;

pub use extractor::{AuthUser, MaybeAuthUser};
pub use jwt::{Claims, JwtKeys};
pub use users::{CreateUserInput, authenticate, create_user};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

impl Role {
    /// Admins can do everything editors can.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Editor => true,
            Role::Admin => self == Role::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A CMS account. The hash never leaves the server.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whoever performs a mutation, as recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Option<String>,
    pub label: String,
    pub role: Role,
}

impl Actor {
    /// Seeds, migrations and CLI maintenance.
    pub fn system() -> Self {
        Self {
            id: None,
            label: "system".to_string(),
            role: Role::Admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::Admin.satisfies(Role::Editor));
        assert!(Role::Editor.satisfies(Role::Editor));
        assert!(!Role::Editor.satisfies(Role::Admin));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("editor".parse::<Role>().unwrap(), Role::Editor);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_serialization_hides_hash() {
        let user = User {
            id: "u1".into(),
            email: "a@b.co".into(),
            name: "A".into(),
            password_hash: "secret".into(),
            role: Role::Admin,
            created_at: crate::common::now(),
            updated_at: crate::common::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "admin");
    }
}
