//! # Axum Helpers
//!
//! Shared web plumbing for the print shop API.
//!
//! - **[`auth`]**: stateless JWT issuing and verification, auth middleware, cookies
//! - **[`server`]**: router assembly with API docs, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: structured error responses with error codes
//! - **[`extractors`]**: UUID paths, validated JSON, caller identity

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{
    ADMIN_ROLE, JwtAuth, JwtClaims, JwtConfig, jwt_auth_middleware, optional_jwt_auth_middleware,
};
pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::{AdminUser, AuthUser, CurrentUser, MaybeUser, UuidPath, ValidatedJson};
pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks,
};
