//! Authentication endpoints: register, login, logout and the caller's own
//! account.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
};
use axum_helpers::{
    AppError, CurrentUser, JwtAuth, ValidatedJson,
    auth::{access_token_cookie, clear_access_token_cookie},
    errors::responses::{
        BadRequestValidationResponse, ConflictResponse, ForbiddenResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{UserError, UserResult};
use crate::models::{
    Address, AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, Role,
    UpdateProfile, UserResponse,
};
use crate::repository::UserRepository;
use crate::service::UserService;

#[derive(OpenApi)]
#[openapi(
    paths(register, login, logout, me, update_me, change_password),
    components(
        schemas(
            RegisterRequest, LoginRequest, AuthResponse, UserResponse, UpdateProfile,
            ChangePasswordRequest, Address, Role
        ),
        responses(
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and the signed-in account")
    )
)]
pub struct AuthApiDoc;

/// Shared state for the auth endpoints
pub struct AuthState<R: UserRepository> {
    pub service: UserService<R>,
    pub jwt: JwtAuth,
    /// Add `Secure` to the token cookie (production)
    pub secure_cookies: bool,
}

impl<R: UserRepository> AuthState<R> {
    pub fn new(service: UserService<R>, jwt: JwtAuth) -> Self {
        Self {
            service,
            jwt,
            secure_cookies: false,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Issue a token for `user` and build the body plus cookie header.
    fn issue(&self, user: UserResponse) -> UserResult<(HeaderValue, AuthResponse)> {
        let token = self
            .jwt
            .create_access_token(user.id, &user.email, &user.name, &user.role_names())
            .map_err(|e| UserError::Token(e.to_string()))?;

        let cookie = access_token_cookie(&token, self.jwt.access_ttl_secs(), self.secure_cookies);
        let cookie =
            HeaderValue::from_str(&cookie).map_err(|e| UserError::Internal(e.to_string()))?;

        Ok((
            cookie,
            AuthResponse {
                access_token: token,
                token_type: "Bearer".to_string(),
                expires_in: self.jwt.access_ttl_secs(),
                user,
            },
        ))
    }
}

/// Create the `/auth` router
pub fn router<R: UserRepository + 'static>(state: AuthState<R>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me).put(update_me))
        .route("/password", post(change_password))
        .with_state(Arc::new(state))
}

/// Register a customer account and sign in
#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register<R: UserRepository>(
    State(state): State<Arc<AuthState<R>>>,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> UserResult<Response> {
    let user = state.service.register(input).await?;
    let (cookie, body) = state.issue(user)?;

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(body),
    )
        .into_response())
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn login<R: UserRepository>(
    State(state): State<Arc<AuthState<R>>>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> UserResult<Response> {
    let user = state.service.authenticate(input).await?;
    let (cookie, body) = state.issue(user)?;

    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)).into_response())
}

/// Clear the token cookie. Tokens are stateless, so a bearer token stays
/// valid until it expires.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Cookie cleared")
    )
)]
async fn logout<R: UserRepository>(
    State(state): State<Arc<AuthState<R>>>,
) -> Result<Response, AppError> {
    let cookie = HeaderValue::from_str(&clear_access_token_cookie(state.secure_cookies))
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
    )
        .into_response())
}

/// The signed-in account
#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn me<R: UserRepository>(
    State(state): State<Arc<AuthState<R>>>,
    CurrentUser(user): CurrentUser,
) -> UserResult<Json<UserResponse>> {
    Ok(Json(state.service.get_active_user(user.id).await?))
}

/// Update name, phone or addresses
#[utoipa::path(
    put,
    path = "/me",
    tag = "Auth",
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_me<R: UserRepository>(
    State(state): State<Arc<AuthState<R>>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<UpdateProfile>,
) -> UserResult<Json<UserResponse>> {
    Ok(Json(state.service.update_profile(user.id, input).await?))
}

/// Change password
#[utoipa::path(
    post,
    path = "/password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn change_password<R: UserRepository>(
    State(state): State<Arc<AuthState<R>>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<ChangePasswordRequest>,
) -> UserResult<StatusCode> {
    state.service.change_password(user.id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}
