//! Stateless JWT authentication.
//!
//! ```ignore
//! use axum_helpers::auth::{JwtAuth, JwtConfig, optional_jwt_auth_middleware};
//! use core_config::FromEnv;
//!
//! let auth = JwtAuth::new(&JwtConfig::from_env()?);
//!
//! let api = Router::new()
//!     .nest("/orders", orders_router)
//!     .layer(axum::middleware::from_fn_with_state(auth, optional_jwt_auth_middleware));
//! ```
//!
//! Handlers then ask for `CurrentUser`, `AdminUser` or `MaybeUser`.

pub mod config;
pub mod cookie;
pub mod jwt;
pub mod middleware;

/// Role granting access to admin endpoints.
pub const ADMIN_ROLE: &str = "admin";

pub use config::JwtConfig;
pub use cookie::{access_token_cookie, clear_access_token_cookie};
pub use jwt::{AuthError, JwtAuth, JwtClaims};
pub use middleware::{ACCESS_TOKEN_COOKIE, jwt_auth_middleware, optional_jwt_auth_middleware};
