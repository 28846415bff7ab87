//! Admin user management endpoints

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use axum_helpers::{
    AdminUser, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::UserResult;
use crate::models::{AdminUpdateUser, UserFilter, UserList, UserResponse};
use crate::repository::UserRepository;
use crate::service::UserService;

#[derive(OpenApi)]
#[openapi(
    paths(list_users, get_user, update_user, delete_user),
    components(
        schemas(UserList, UserFilter, AdminUpdateUser),
        responses(
            BadRequestUuidResponse,
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Users", description = "Admin user management")
    )
)]
pub struct ApiDoc;

/// Create the `/users` router; every route requires the admin role
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    Router::new()
        .route("/", get(list_users))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .with_state(Arc::new(service))
}

/// List users with optional filters
#[utoipa::path(
    get,
    path = "",
    tag = "Users",
    params(UserFilter),
    responses(
        (status = 200, description = "Page of users", body = UserList),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<UserFilter>,
) -> UserResult<Json<UserList>> {
    Ok(Json(service.list_users(filter).await?))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    AdminUser(_admin): AdminUser,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserResponse>> {
    Ok(Json(service.get_user(id).await?))
}

/// Change roles or activate/deactivate an account
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AdminUpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<AdminUpdateUser>,
) -> UserResult<Json<UserResponse>> {
    Ok(Json(service.admin_update_user(admin.id, id, input).await?))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
) -> UserResult<StatusCode> {
    service.delete_user(admin.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
