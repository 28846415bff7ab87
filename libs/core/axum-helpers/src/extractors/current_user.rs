//! Identity extractors backed by claims that the JWT middleware placed in
//! request extensions.

use crate::auth::{ADMIN_ROLE, JwtClaims};
use crate::errors::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use uuid::Uuid;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ADMIN_ROLE)
    }

    fn from_claims(claims: &JwtClaims) -> Option<Self> {
        let id = Uuid::parse_str(&claims.sub).ok()?;
        Some(Self {
            id,
            email: claims.email.clone(),
            name: claims.name.clone(),
            roles: claims.roles.clone(),
        })
    }

    fn from_parts(parts: &Parts) -> Option<Self> {
        parts
            .extensions
            .get::<JwtClaims>()
            .and_then(Self::from_claims)
    }
}

/// Requires a signed-in user (401 otherwise).
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

/// Requires a signed-in user with the `admin` role (401 or 403 otherwise).
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// The caller when signed in, `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        AuthUser::from_parts(parts)
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_parts(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin role required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(AuthUser::from_parts(parts)))
    }
}
