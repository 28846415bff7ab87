use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use domain_orders::OrderError;
use domain_print_orders::PrintOrderError;
use domain_products::ProductError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Orders(#[from] OrderError),

    #[error(transparent)]
    PrintOrders(#[from] PrintOrderError),

    #[error(transparent)]
    Catalog(#[from] ProductError),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type ReportResult<T> = Result<T, ReportError>;

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(msg) => AppError::BadRequest(msg),
            ReportError::Orders(e) => e.into(),
            ReportError::PrintOrders(e) => e.into(),
            ReportError::Catalog(e) => e.into(),
            ReportError::Export(_) => AppError::InternalServerError(err.to_string()),
            ReportError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for ReportError {
    fn from(err: mongodb::error::Error) -> Self {
        ReportError::Database(err.to_string())
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Export(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ReportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ReportError::Export(err.to_string())
    }
}
