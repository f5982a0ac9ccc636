//! Source documents: the immutable uploaded bytes plus their declared type.
//!
//! A [`SourceDocument`] is owned by the caller for one pipeline call. The
//! rasteriser and the extractor both read the same `Arc<[u8]>` buffer and
//! never mutate it, so they can run concurrently without copying.

use crate::error::IngestError;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub bytes: Arc<[u8]>,
    /// Declared media type, e.g. `application/pdf`.
    pub media_type: String,
    /// Original file name, e.g. `jane_doe.pdf`.
    pub file_name: String,
}

impl SourceDocument {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        media_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Shorthand for a document declared as `application/pdf`.
    pub fn pdf(bytes: impl Into<Arc<[u8]>>, file_name: impl Into<String>) -> Self {
        Self::new(bytes, PDF_MEDIA_TYPE, file_name)
    }

    /// Read a local file. The media type is sniffed from the `%PDF` magic
    /// bytes, then from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IngestError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => IngestError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => IngestError::ReadFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            },
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let media_type = if bytes.starts_with(PDF_MAGIC) {
            PDF_MEDIA_TYPE.to_string()
        } else {
            media_type_for_extension(path).to_string()
        };

        debug!(
            "Read {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            media_type
        );
        Ok(Self::new(bytes, media_type, file_name))
    }

    /// Whether the buffer starts with the PDF magic bytes.
    pub fn looks_like_pdf(&self) -> bool {
        self.bytes.starts_with(PDF_MAGIC)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reject anything that is not a non-empty `application/pdf` upload.
    ///
    /// Runs before the engine is touched.
    pub fn ensure_pdf(&self) -> Result<(), IngestError> {
        let essence = self
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence != PDF_MEDIA_TYPE {
            let hint = if essence.starts_with("image/") {
                "Scanned images are not supported; upload the resume as a PDF."
            } else {
                "Only PDF files can be processed."
            };
            return Err(IngestError::UnsupportedType {
                media_type: self.media_type.clone(),
                hint: hint.to_string(),
            });
        }
        if self.bytes.is_empty() {
            return Err(IngestError::EmptyInput {
                file_name: self.file_name.clone(),
            });
        }
        Ok(())
    }
}

fn media_type_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MEDIA_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
