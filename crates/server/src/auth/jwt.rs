use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::{Role, User};
use crate::config::Auth;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification keys plus token policy.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl_secs: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, settings: &Auth) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: settings.issuer.clone(),
            ttl_secs: settings.token_ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn issue(&self, user: &User) -> ApiResult<String> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            iat,
            exp: iat + self.ttl_secs,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> ApiResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        ApiError::Unauthorized("token expired".into())
                    }
                    _ => ApiError::Unauthorized("invalid token".into()),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::now;

    fn settings() -> Auth {
        Auth::default()
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            email: "editor@visit.example".into(),
            name: "Editor".into(),
            password_hash: "x".into(),
            role: Role::Editor,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = JwtKeys::new("0123456789abcdef0123456789abcdef", &settings());
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, Role::Editor);
        assert_eq!(claims.iss, "tourism-cms");
        assert_eq!(claims.exp - claims.iat, settings().token_ttl_secs);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let keys = JwtKeys::new("0123456789abcdef0123456789abcdef", &settings());
        let other = JwtKeys::new("fedcba9876543210fedcba9876543210", &settings());
        let token = keys.issue(&user()).unwrap();
        assert!(matches!(other.verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let keys = JwtKeys::new("0123456789abcdef0123456789abcdef", &settings());
        let mut other_settings = settings();
        other_settings.issuer = "someone-else".into();
        let other = JwtKeys::new("0123456789abcdef0123456789abcdef", &other_settings);

        let token = other.issue(&user()).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = JwtKeys::new("0123456789abcdef0123456789abcdef", &settings());
        let past = chrono::Utc::now().timestamp() - 3600;
        let claims = Claims {
            sub: "u1".into(),
            email: "editor@visit.example".into(),
            role: Role::Editor,
            iss: "tourism-cms".into(),
            iat: past - 60,
            exp: past,
        };
        let token = keys.sign(&claims).unwrap();
        match keys.verify(&token) {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "token expired"),
            other => panic!("expected expiry rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_rejected() {
        let keys = JwtKeys::new("0123456789abcdef0123456789abcdef", &settings());
        assert!(keys.verify("not.a.jwt").is_err());
    }
}
