//! Product images shipped as a zip next to the spreadsheet.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::{ProductError, ProductResult};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Upper bound on entries read from one archive.
const MAX_ENTRIES: usize = 5000;

/// Upper bound on the uncompressed bytes kept from one archive.
pub const MAX_ARCHIVE_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ArchiveImage {
    /// Path inside the archive, `/` separated
    pub path: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Images from the archive with lookup tables for each matching strategy.
#[derive(Debug, Default)]
pub struct ImageArchive {
    images: Vec<ArchiveImage>,
    by_path: HashMap<String, usize>,
    by_file_name: HashMap<String, usize>,
    by_stem: HashMap<String, usize>,
}

impl ImageArchive {
    /// Read every usable image. Directories, macOS metadata, hidden files,
    /// unsafe paths, non-images and entries over `max_image_bytes` are skipped.
    pub fn from_zip(bytes: &[u8], max_image_bytes: usize) -> ProductResult<Self> {
        Self::from_zip_within(bytes, max_image_bytes, MAX_ARCHIVE_BYTES)
    }

    /// Like [`ImageArchive::from_zip`], failing once the images read add up
    /// to more than `budget` bytes. Sizes are counted from the decompressed
    /// data, not from the entry headers.
    pub fn from_zip_within(
        bytes: &[u8],
        max_image_bytes: usize,
        budget: u64,
    ) -> ProductResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ProductError::InvalidUpload(format!("Invalid ZIP: {e}")))?;

        let mut result = ImageArchive::default();
        let mut total: u64 = 0;
        for i in 0..archive.len().min(MAX_ENTRIES) {
            let mut file = archive
                .by_index(i)
                .map_err(|e| ProductError::InvalidUpload(format!("Invalid ZIP entry: {e}")))?;

            if file.is_dir() {
                continue;
            }
            let Some(path) = file
                .enclosed_name()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
            else {
                tracing::warn!(entry = %file.name(), "Skipping unsafe archive path");
                continue;
            };
            if !is_candidate(&path) {
                continue;
            }
            if file.size() as usize > max_image_bytes {
                tracing::warn!(entry = %path, size = file.size(), "Skipping oversize image");
                continue;
            }

            let mut data = Vec::with_capacity(file.size() as usize);
            (&mut file)
                .take(max_image_bytes as u64 + 1)
                .read_to_end(&mut data)
                .map_err(|e| ProductError::InvalidUpload(format!("Failed to read {path}: {e}")))?;
            if data.len() > max_image_bytes {
                tracing::warn!(
                    entry = %path,
                    declared = file.size(),
                    "Skipping image larger than its header claims"
                );
                continue;
            }

            total += data.len() as u64;
            if total > budget {
                return Err(ProductError::InvalidUpload(format!(
                    "Image archive expands to more than {budget} bytes"
                )));
            }

            result.insert(ArchiveImage {
                file_name: file_name_of(&path).to_string(),
                path,
                data,
            });
        }

        tracing::debug!(images = result.images.len(), "Image archive indexed");
        Ok(result)
    }

    fn insert(&mut self, image: ArchiveImage) {
        let index = self.images.len();
        // First entry wins when several share a name
        self.by_path.entry(image.path.to_lowercase()).or_insert(index);
        self.by_file_name
            .entry(image.file_name.to_lowercase())
            .or_insert(index);
        self.by_stem
            .entry(lookup_key(stem_of(&image.file_name)))
            .or_insert(index);
        self.images.push(image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> &ArchiveImage {
        &self.images[index]
    }

    /// Resolve a reference from the sheet: exact path, then file name ignoring
    /// case, then file stem ignoring extension.
    pub fn resolve(&self, reference: &str) -> Option<usize> {
        let reference = reference.trim().trim_start_matches("./").replace('\\', "/");
        if reference.is_empty() {
            return None;
        }
        let lower = reference.to_lowercase();

        self.by_path
            .get(&lower)
            .or_else(|| self.by_file_name.get(file_name_of(&lower)))
            .or_else(|| self.by_stem.get(&lookup_key(stem_of(file_name_of(&lower)))))
            .copied()
    }

    /// Image whose file stem equals `key` after normalization (SKU or name
    /// slug).
    pub fn by_key(&self, key: &str) -> Option<usize> {
        let key = lookup_key(key);
        if key.is_empty() {
            return None;
        }
        self.by_stem.get(&key).copied()
    }

    /// Paths of the images not in `used`, for the report.
    pub fn unused<'a>(&'a self, used: &'a [bool]) -> impl Iterator<Item = &'a str> + 'a {
        self.images
            .iter()
            .enumerate()
            .filter(move |(i, _)| !used.get(*i).copied().unwrap_or(false))
            .map(|(_, image)| image.path.as_str())
    }
}

fn is_candidate(path: &str) -> bool {
    if path.split('/').any(|segment| segment == "__MACOSX") {
        return false;
    }
    let name = file_name_of(path);
    if name.starts_with('.') {
        return false;
    }
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn stem_of(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Slug used to compare stems, SKUs and product names: lower-case words
/// joined by `-`.
pub fn lookup_key(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// `http(s)` references are kept as URLs instead of archive lookups.
pub fn is_remote(reference: &str) -> bool {
    let lower = reference.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
