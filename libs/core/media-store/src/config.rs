use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or_default};
use std::path::PathBuf;

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 50 * 1024 * 1024;

/// Where uploads live and how they are addressed.
///
/// - `UPLOAD_DIR` (default: `./uploads`)
/// - `MEDIA_BASE_URL` (default: `/media`)
/// - `MAX_IMAGE_BYTES` (default: 10 MiB)
/// - `MAX_DOCUMENT_BYTES` (default: 50 MiB)
#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub upload_dir: PathBuf,
    pub base_url: String,
    pub max_image_bytes: usize,
    pub max_document_bytes: usize,
}

impl MediaConfig {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            base_url: "/media".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl FromEnv for MediaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            upload_dir: PathBuf::from(env_or_default("UPLOAD_DIR", "./uploads")),
            base_url: env_or_default("MEDIA_BASE_URL", "/media")
                .trim_end_matches('/')
                .to_string(),
            max_image_bytes: env_parse_or_default("MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?,
            max_document_bytes: env_parse_or_default(
                "MAX_DOCUMENT_BYTES",
                DEFAULT_MAX_DOCUMENT_BYTES,
            )?,
        })
    }
}
