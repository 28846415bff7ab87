use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use domain_products::ProductError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Product {0} is not available for purchase")]
    ProductUnavailable(Uuid),

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Product {0} is not in the cart")]
    ItemNotFound(Uuid),

    #[error("Product {0} is not in the wishlist")]
    WishlistItemNotFound(Uuid),

    #[error("At most {0} units of a product per order line")]
    QuantityLimit(i32),

    #[error("Cart is full ({0} products)")]
    CartFull(usize),

    #[error("Wishlist is full ({0} products)")]
    WishlistFull(usize),

    #[error("Cart was modified concurrently, retry")]
    ConcurrentUpdate,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] ProductError),

    #[error("Database error: {0}")]
    Database(String),
}

pub type CartResult<T> = Result<T, CartError>;

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ProductNotFound(_)
            | CartError::ItemNotFound(_)
            | CartError::WishlistItemNotFound(_) => AppError::NotFound(err.to_string()),
            CartError::ProductUnavailable(_) | CartError::ConcurrentUpdate => {
                AppError::Conflict(err.to_string())
            }
            CartError::InsufficientStock { .. }
            | CartError::QuantityLimit(_)
            | CartError::CartFull(_)
            | CartError::WishlistFull(_) => AppError::BadRequest(err.to_string()),
            CartError::Validation(msg) => AppError::BadRequest(msg),
            CartError::Catalog(e) => e.into(),
            CartError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for CartError {
    fn from(err: mongodb::error::Error) -> Self {
        CartError::Database(err.to_string())
    }
}
