use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use domain_products::ProductError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Review not found: {0}")]
    NotFound(Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("You have already reviewed this product")]
    AlreadyReviewed,

    #[error("Only the author can change this review")]
    NotAuthor,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] ProductError),

    #[error("Database error: {0}")]
    Database(String),
}

pub type ReviewResult<T> = Result<T, ReviewError>;

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::NotFound(_) | ReviewError::ProductNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            ReviewError::AlreadyReviewed => AppError::Conflict(err.to_string()),
            ReviewError::NotAuthor => AppError::Forbidden(err.to_string()),
            ReviewError::Validation(msg) => AppError::BadRequest(msg),
            ReviewError::Catalog(e) => e.into(),
            ReviewError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for ReviewError {
    fn from(err: mongodb::error::Error) -> Self {
        // The only unique index is (product_id, user_id)
        if database::is_duplicate_key(&err) {
            return ReviewError::AlreadyReviewed;
        }
        ReviewError::Database(err.to_string())
    }
}
