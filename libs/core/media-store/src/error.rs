use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("File is empty")]
    Empty,

    #[error("Unsupported file type '{extension}'; allowed: {allowed}")]
    UnsupportedType { extension: String, allowed: String },

    #[error("File is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("File content is not a valid image")]
    NotAnImage,

    #[error("Invalid media key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Empty | MediaError::NotAnImage | MediaError::InvalidKey(_) => {
                AppError::BadRequest(err.to_string())
            }
            MediaError::UnsupportedType { .. } => AppError::UnsupportedMediaType(err.to_string()),
            MediaError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            MediaError::Io(e) => AppError::Io(e),
        }
    }
}
