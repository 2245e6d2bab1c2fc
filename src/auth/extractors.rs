use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Extracts and validates the bearer token, yielding the user ID.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Identity a request acts under. Record operations call [`Caller::require`]
/// and fail with an authorization error when nobody is signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller {
    user_id: Option<Uuid>,
}

impl Caller {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn require(&self) -> Result<Uuid, AppError> {
        self.user_id
            .ok_or_else(|| AppError::unauthorized("Authentication credentials were not provided"))
    }
}

impl From<AuthUser> for Caller {
    fn from(AuthUser(user_id): AuthUser) -> Self {
        Caller::user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_caller_cannot_be_resolved() {
        let err = Caller::anonymous().require().unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn auth_user_becomes_caller() {
        let id = Uuid::new_v4();
        assert_eq!(Caller::from(AuthUser(id)).require().unwrap(), id);
    }
}
