use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use domain_products::ProductError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{OrderStatus, PaymentStatus};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order '{0}' not found")]
    NumberNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Product '{0}' is not available for purchase")]
    ProductUnavailable(String),

    #[error("'{name}' must be ordered in quantities of at least {minimum}")]
    BelowMinimum { name: String, minimum: i32 },

    #[error("Insufficient stock for '{name}': available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i32,
        requested: i32,
    },

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Cannot change payment status from {from} to {to}")]
    InvalidPaymentChange {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Order was modified concurrently, retry")]
    ConcurrentUpdate,

    #[error("Order number already in use")]
    DuplicateOrderNumber,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] ProductError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(_)
            | OrderError::NumberNotFound(_)
            | OrderError::ProductNotFound(_) => AppError::NotFound(err.to_string()),
            OrderError::ProductUnavailable(_)
            | OrderError::InvalidTransition { .. }
            | OrderError::InvalidPaymentChange { .. }
            | OrderError::ConcurrentUpdate
            | OrderError::DuplicateOrderNumber => AppError::Conflict(err.to_string()),
            OrderError::BelowMinimum { .. } | OrderError::InsufficientStock { .. } => {
                AppError::BadRequest(err.to_string())
            }
            OrderError::Validation(msg) => AppError::BadRequest(msg),
            OrderError::Catalog(e) => e.into(),
            OrderError::Database(msg) => AppError::Database(msg),
            OrderError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for OrderError {
    fn from(err: mongodb::error::Error) -> Self {
        if database::is_duplicate_key(&err) {
            return OrderError::DuplicateOrderNumber;
        }
        OrderError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: OrderError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(OrderError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OrderError::BelowMinimum {
                name: "Cards".into(),
                minimum: 100
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_transition_message_uses_wire_names() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Cannot change order status from shipped to cancelled");
    }
}
