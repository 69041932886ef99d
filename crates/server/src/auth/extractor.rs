use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::{Actor, Claims, Role};
use crate::api::AppState;
use crate::common::Visibility;
use crate::error::{ApiError, ApiResult};

/// A caller holding a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn require(&self, role: Role) -> ApiResult<()> {
        if self.0.role.satisfies(role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "{} role required",
                role.as_str()
            )))
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: Some(self.0.sub.clone()),
            label: self.0.email.clone(),
            role: self.0.role,
        }
    }
}

/// The token is optional, but a token that is present must be valid.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn visibility(&self) -> Visibility {
        match self.0 {
            Some(_) => Visibility::Staff,
            None => Visibility::Public,
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<Result<&str, ApiError>> {
    let header = parts.headers.get(AUTHORIZATION)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing or invalid bearer token".into()));
    Some(token)
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = bearer_token(parts)
            .unwrap_or_else(|| Err(ApiError::Unauthorized("missing or invalid bearer token".into())))?;
        let claims = state.jwt.verify(token)?;
        Ok(AuthUser(claims))
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        match bearer_token(parts) {
            None => Ok(MaybeAuthUser(None)),
            Some(token) => {
                let claims = state.jwt.verify(token?)?;
                Ok(MaybeAuthUser(Some(AuthUser(claims))))
            }
        }
    }
}
