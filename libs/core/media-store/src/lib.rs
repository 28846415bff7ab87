//! Content-addressed storage for uploaded product images and print files.
//!
//! Files land under `UPLOAD_DIR` at `{kind}/{sha[0..2]}/{sha}.{ext}` and are
//! served by the application under `MEDIA_BASE_URL`. Identical uploads share
//! one file.
//!
//! ```rust,no_run
//! use media_store::{MediaConfig, MediaKind, MediaStore};
//!
//! # async fn example() -> Result<(), media_store::MediaError> {
//! let store = MediaStore::open(MediaConfig::default()).await?;
//! let bytes = std::fs::read("card.png")?;
//! let stored = store.store(MediaKind::ProductImage, "card.png", &bytes).await?;
//! println!("{}", stored.url);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod kind;
mod store;

pub use config::MediaConfig;
pub use error::{MediaError, MediaResult};
pub use kind::MediaKind;
pub use store::{MediaStore, StoredMedia};
