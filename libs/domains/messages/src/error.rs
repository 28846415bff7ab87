use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Thread not found: {0}")]
    NotFound(Uuid),

    #[error("Thread is closed")]
    Closed,

    #[error("Thread has reached its message limit, start a new one")]
    ThreadFull,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type MessageResult<T> = Result<T, MessageError>;

impl From<MessageError> for AppError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::NotFound(_) => AppError::NotFound(err.to_string()),
            MessageError::Closed | MessageError::ThreadFull => AppError::Conflict(err.to_string()),
            MessageError::Validation(msg) => AppError::BadRequest(msg),
            MessageError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for MessageError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for MessageError {
    fn from(err: mongodb::error::Error) -> Self {
        MessageError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for MessageError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        MessageError::Database(err.to_string())
    }
}
