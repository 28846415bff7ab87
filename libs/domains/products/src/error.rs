use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use media_store::MediaError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(Uuid),

    #[error("Product with SKU '{0}' not found")]
    SkuNotFound(String),

    #[error("Product with SKU '{0}' already exists")]
    DuplicateSku(String),

    #[error("Product with name '{0}' already exists")]
    DuplicateName(String),

    #[error("A product with the same SKU or name already exists")]
    Duplicate,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Unreadable upload: {0}")]
    InvalidUpload(String),

    #[error("Media storage is not configured")]
    MediaUnavailable,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => AppError::NotFound(format!("Product {} not found", id)),
            ProductError::SkuNotFound(sku) => {
                AppError::NotFound(format!("Product with SKU '{}' not found", sku))
            }
            ProductError::DuplicateSku(_)
            | ProductError::DuplicateName(_)
            | ProductError::Duplicate => AppError::Conflict(err.to_string()),
            ProductError::Validation(msg) => AppError::BadRequest(msg),
            ProductError::InsufficientStock {
                available,
                requested,
            } => AppError::BadRequest(format!(
                "Insufficient stock: {} available, {} requested",
                available, requested
            )),
            ProductError::InvalidUpload(msg) => AppError::BadRequest(msg),
            ProductError::MediaUnavailable => AppError::ServiceUnavailable(err.to_string()),
            ProductError::Media(e) => e.into(),
            ProductError::Database(msg) => AppError::Database(msg),
            ProductError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for ProductError {
    fn from(err: mongodb::error::Error) -> Self {
        if database::is_duplicate_key(&err) {
            return ProductError::Duplicate;
        }
        ProductError::Database(err.to_string())
    }
}
