use serde::{Deserialize, Serialize};

/// Category of stored content. Decides the directory, the allowed extensions
/// and the size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    ProductImage,
    PrintFile,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
const PRINT_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "tif", "tiff", "ai", "eps", "psd", "svg", "docx", "pptx",
];

impl MediaKind {
    pub fn directory(&self) -> &'static str {
        match self {
            MediaKind::ProductImage => "products",
            MediaKind::PrintFile => "print-files",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::ProductImage => IMAGE_EXTENSIONS,
            MediaKind::PrintFile => PRINT_EXTENSIONS,
        }
    }

    pub fn allows(&self, extension: &str) -> bool {
        self.allowed_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// Lower-cased extension of a file name, if it has one.
pub(crate) fn extension_of(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub(crate) fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "ai" => "application/postscript",
        "eps" => "application/postscript",
        "psd" => "image/vnd.adobe.photoshop",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Card.PNG").as_deref(), Some("png"));
        assert_eq!(extension_of("dir/sub/file.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("C:\\scans\\page.TIFF").as_deref(), Some("tiff"));
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_kind_allow_lists() {
        assert!(MediaKind::ProductImage.allows("WEBP"));
        assert!(!MediaKind::ProductImage.allows("pdf"));
        assert!(MediaKind::PrintFile.allows("pdf"));
        assert!(!MediaKind::PrintFile.allows("exe"));
    }
}
