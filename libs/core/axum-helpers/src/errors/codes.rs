//! Type-safe error codes for API responses.
//!
//! Each code has a string id for clients (`"VALIDATION_ERROR"`), an integer
//! for logs and dashboards (`1001`) and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ValidationError;
//! assert_eq!(code.as_str(), "VALIDATION_ERROR");
//! assert_eq!(code.code(), 1001);
//! assert_eq!(code.default_message(), "Request validation failed");
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Client errors live in 1000-1999, database errors in 2000-2999,
/// I/O in 4000s and serialization in 5000s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidUuid,
    InvalidJson,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    UnprocessableEntity,
    JsonExtraction,
    InternalError,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,
    UnsupportedMediaType,

    DatabaseError,
    DuplicateKey,

    IoError,
    SerdeJsonError,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidUuid => "INVALID_UUID",
            Self::InvalidJson => "INVALID_JSON",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::BadRequest => "BAD_REQUEST",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::DuplicateKey => "DUPLICATE_KEY",
            Self::IoError => "IO_ERROR",
            Self::SerdeJsonError => "SERDE_JSON_ERROR",
        }
    }

    pub const fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::InvalidUuid => 1002,
            Self::InvalidJson => 1003,
            Self::NotFound => 1004,
            Self::Unauthorized => 1005,
            Self::Forbidden => 1006,
            Self::Conflict => 1007,
            Self::UnprocessableEntity => 1008,
            Self::JsonExtraction => 1009,
            Self::InternalError => 1010,
            Self::ServiceUnavailable => 1011,
            Self::BadRequest => 1012,
            Self::PayloadTooLarge => 1013,
            Self::UnsupportedMediaType => 1014,
            Self::DatabaseError => 2001,
            Self::DuplicateKey => 2002,
            Self::IoError => 4001,
            Self::SerdeJsonError => 5001,
        }
    }

    pub const fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::InvalidUuid => "Invalid UUID format",
            Self::InvalidJson => "Invalid JSON format",
            Self::NotFound => "Resource not found",
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "Access forbidden",
            Self::Conflict => "Resource already exists",
            Self::UnprocessableEntity => "Unprocessable entity",
            Self::JsonExtraction => "Failed to extract JSON from request body",
            Self::InternalError => "An internal server error occurred",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
            Self::BadRequest => "Bad request",
            Self::PayloadTooLarge => "Payload too large",
            Self::UnsupportedMediaType => "Unsupported media type",
            Self::DatabaseError => "A database error occurred",
            Self::DuplicateKey => "A record with the same unique value already exists",
            Self::IoError => "I/O error occurred",
            Self::SerdeJsonError => "JSON serialization error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
