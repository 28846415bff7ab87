use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};
use crate::kind::{MediaKind, content_type_for, extension_of};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata of a stored file, embedded in the documents that reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredMedia {
    /// Storage key relative to the upload directory
    pub key: String,
    /// Public URL
    pub url: String,
    pub original_name: String,
    pub content_type: String,
    pub size: i64,
    /// Hex SHA-256 of the content
    pub sha256: String,
}

#[derive(Clone, Debug)]
pub struct MediaStore {
    config: MediaConfig,
}

impl MediaStore {
    /// Create the upload directory if needed.
    pub async fn open(config: MediaConfig) -> MediaResult<Self> {
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        info!(dir = %config.upload_dir.display(), "Media store ready");
        Ok(Self { config })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }

    pub fn limit_for(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::ProductImage => self.config.max_image_bytes,
            MediaKind::PrintFile => self.config.max_document_bytes,
        }
    }

    /// Validate and persist `bytes`. Storing the same content twice returns
    /// the same key without rewriting the file.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store(
        &self,
        kind: MediaKind,
        original_name: &str,
        bytes: &[u8],
    ) -> MediaResult<StoredMedia> {
        let extension = self.validate(kind, original_name, bytes)?;

        let sha256 = const_hex::encode(Sha256::digest(bytes));
        let key = format!("{}/{}/{}.{}", kind.directory(), &sha256[..2], sha256, extension);
        let path = self.config.upload_dir.join(&key);

        if tokio::fs::try_exists(&path).await? {
            debug!(key = %key, "Content already stored");
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
            tokio::fs::write(&tmp, bytes).await?;
            tokio::fs::rename(&tmp, &path).await?;
            info!(key = %key, "Media stored");
        }

        Ok(StoredMedia {
            url: self.url_for(&key),
            key,
            original_name: display_name(original_name),
            content_type: content_type_for(&extension).to_string(),
            size: bytes.len() as i64,
            sha256,
        })
    }

    /// Returns the canonical extension to store the file under.
    fn validate(&self, kind: MediaKind, original_name: &str, bytes: &[u8]) -> MediaResult<String> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }

        let extension = extension_of(original_name).unwrap_or_default();
        if !kind.allows(&extension) {
            return Err(MediaError::UnsupportedType {
                extension,
                allowed: kind.allowed_extensions().join(", "),
            });
        }

        let limit = self.limit_for(kind);
        if bytes.len() > limit {
            return Err(MediaError::TooLarge {
                size: bytes.len(),
                limit,
            });
        }

        if kind == MediaKind::ProductImage {
            return sniff_image(bytes);
        }
        Ok(extension)
    }

    /// Remove a stored file. Returns `false` when it did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> MediaResult<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(key, "Media deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read(&self, key: &str) -> MediaResult<Vec<u8>> {
        Ok(tokio::fs::read(self.path_for(key)?).await?)
    }

    /// Absolute path of a key; keys that could escape the upload directory
    /// are rejected.
    pub fn path_for(&self, key: &str) -> MediaResult<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        Ok(self.config.upload_dir.join(relative))
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), key)
    }
}

fn sniff_image(bytes: &[u8]) -> MediaResult<String> {
    let extension = match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "jpg",
        Ok(ImageFormat::Png) => "png",
        Ok(ImageFormat::WebP) => "webp",
        Ok(ImageFormat::Gif) => "gif",
        _ => return Err(MediaError::NotAnImage),
    };
    Ok(extension.to_string())
}

/// Last path segment of a client-supplied name, bounded in length.
fn display_name(original_name: &str) -> String {
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
        .trim();
    name.chars().take(255).collect()
}
