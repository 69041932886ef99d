//! Configuration management for the CMS
//!
//! Configuration is stored in RON format. Every section has defaults so a
//! missing file or a partial file still yields a runnable server.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: Server,

    #[serde(default)]
    pub database: Database,

    #[serde(default)]
    pub auth: Auth,

    #[serde(default)]
    pub uploads: Uploads,

    #[serde(default)]
    pub pagination: Pagination,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Server {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Database {
    /// Directory holding `cms.db`
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".cms")
}

fn default_max_connections() -> u32 {
    5
}

/// Token signing settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Auth {
    /// Environment variable holding the HS256 signing secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// PBKDF2 rounds for newly hashed passwords
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            token_ttl_secs: default_token_ttl_secs(),
            issuer: default_issuer(),
            password_iterations: default_password_iterations(),
        }
    }
}

fn default_jwt_secret_env() -> String {
    "CMS_JWT_SECRET".to_string()
}

fn default_token_ttl_secs() -> i64 {
    60 * 60 * 24
}

fn default_issuer() -> String {
    "tourism-cms".to_string()
}

fn default_password_iterations() -> u32 {
    100_000
}

/// Media upload settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Uploads {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,

    /// URL prefix the upload directory is served under
    #[serde(default = "default_public_path")]
    pub public_path: String,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for Uploads {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            public_path: default_public_path(),
            max_bytes: default_max_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_path() -> String {
    "/uploads".to_string()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_mime_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/png",
        "image/webp",
        "image/gif",
        "application/pdf",
        "video/mp4",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> u32 {
    10
}

fn default_max_limit() -> u32 {
    100
}

impl Config {
    /// Apply `CMS_DB_PATH` and `CMS_BIND_ADDR` on top of the file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CMS_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(addr) = std::env::var("CMS_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| format!("invalid bind address '{}'", self.server.bind_addr))?;

        if self.pagination.default_limit == 0 || self.pagination.max_limit == 0 {
            return Err("pagination limits must be greater than zero".to_string());
        }
        if self.pagination.default_limit > self.pagination.max_limit {
            return Err(format!(
                "pagination default_limit {} exceeds max_limit {}",
                self.pagination.default_limit, self.pagination.max_limit
            ));
        }

        if self.uploads.max_bytes == 0 {
            return Err("uploads.max_bytes must be greater than zero".to_string());
        }
        if self.uploads.allowed_mime_types.is_empty() {
            return Err("uploads.allowed_mime_types cannot be empty".to_string());
        }
        if !self.uploads.public_path.starts_with('/') {
            return Err(format!(
                "uploads.public_path '{}' must start with '/'",
                self.uploads.public_path
            ));
        }

        if self.auth.token_ttl_secs <= 0 {
            return Err("auth.token_ttl_secs must be positive".to_string());
        }
        if self.auth.password_iterations == 0 {
            return Err("auth.password_iterations must be positive".to_string());
        }

        Ok(())
    }

    /// Resolve the JWT signing secret from the configured environment variable
    pub fn jwt_secret(&self) -> Result<String, String> {
        let secret = std::env::var(&self.auth.jwt_secret_env).map_err(|_| {
            format!(
                "{} environment variable must be set",
                self.auth.jwt_secret_env
            )
        })?;

        if secret.len() < 32 {
            return Err(format!(
                "{} must be at least 32 bytes long",
                self.auth.jwt_secret_env
            ));
        }

        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.pagination.default_limit, 10);
        assert_eq!(config.pagination.max_limit, 100);
        assert_eq!(config.uploads.public_path, "/uploads");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_bind_addr() {
        let mut config = Config::default();
        config.server.bind_addr = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_pagination() {
        let mut config = Config::default();
        config.pagination.default_limit = 200;
        assert!(config.validate().is_err());

        config.pagination.default_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_upload_settings() {
        let mut config = Config::default();
        config.uploads.max_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.uploads.allowed_mime_types.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.uploads.public_path = "uploads".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_jwt_secret_length() {
        let mut config = Config::default();
        config.auth.jwt_secret_env = "CMS_TEST_SHORT_SECRET".to_string();
        unsafe {
            std::env::set_var("CMS_TEST_SHORT_SECRET", "short");
        }
        assert!(config.jwt_secret().is_err());

        config.auth.jwt_secret_env = "CMS_TEST_LONG_SECRET".to_string();
        unsafe {
            std::env::set_var("CMS_TEST_LONG_SECRET", "0123456789abcdef0123456789abcdef");
        }
        assert_eq!(
            config.jwt_secret().unwrap(),
            "0123456789abcdef0123456789abcdef"
        );

        unsafe {
            std::env::remove_var("CMS_TEST_SHORT_SECRET");
            std::env::remove_var("CMS_TEST_LONG_SECRET");
        }
    }

    #[test]
    fn test_jwt_secret_missing() {
        let mut config = Config::default();
        config.auth.jwt_secret_env = "CMS_TEST_MISSING_SECRET".to_string();
        let err = config.jwt_secret().unwrap_err();
        assert!(err.contains("CMS_TEST_MISSING_SECRET"));
    }
}
