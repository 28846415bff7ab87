use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use media_store::MediaError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::PrintStatus;

#[derive(Debug, Error)]
pub enum PrintOrderError {
    #[error("Print order not found: {0}")]
    NotFound(Uuid),

    #[error("No print order matches that reference and email")]
    NotTracked,

    #[error("Cannot change print order status from {from} to {to}")]
    InvalidTransition { from: PrintStatus, to: PrintStatus },

    #[error("Print order is {0} and can no longer be changed")]
    Closed(PrintStatus),

    #[error("Print order was modified concurrently, retry")]
    ConcurrentUpdate,

    #[error("Print order reference already in use")]
    DuplicateReference,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Database error: {0}")]
    Database(String),
}

pub type PrintOrderResult<T> = Result<T, PrintOrderError>;

impl From<PrintOrderError> for AppError {
    fn from(err: PrintOrderError) -> Self {
        match err {
            PrintOrderError::NotFound(_) | PrintOrderError::NotTracked => {
                AppError::NotFound(err.to_string())
            }
            PrintOrderError::InvalidTransition { .. }
            | PrintOrderError::Closed(_)
            | PrintOrderError::ConcurrentUpdate
            | PrintOrderError::DuplicateReference => AppError::Conflict(err.to_string()),
            PrintOrderError::Validation(msg) => AppError::BadRequest(msg),
            PrintOrderError::Media(e) => e.into(),
            PrintOrderError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for PrintOrderError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for PrintOrderError {
    fn from(err: mongodb::error::Error) -> Self {
        if database::is_duplicate_key(&err) {
            return PrintOrderError::DuplicateReference;
        }
        PrintOrderError::Database(err.to_string())
    }
}
