use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => AppError::NotFound(format!("User {} not found", id)),
            UserError::DuplicateEmail(_) => AppError::Conflict(err.to_string()),
            UserError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            UserError::AccountInactive => AppError::Forbidden(err.to_string()),
            UserError::Validation(msg) => AppError::BadRequest(msg),
            UserError::PasswordHash(msg) | UserError::Token(msg) | UserError::Internal(msg) => {
                tracing::error!(error = %msg, "Authentication internals failed");
                AppError::InternalServerError(msg)
            }
            UserError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for UserError {
    fn from(err: mongodb::error::Error) -> Self {
        if database::is_duplicate_key(&err) {
            return UserError::DuplicateEmail("email".to_string());
        }
        UserError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: UserError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(UserError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(UserError::DuplicateEmail("a@b.co".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(UserError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(UserError::AccountInactive), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(UserError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(UserError::PasswordHash("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
