//! Error types for the pdf-ingest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IngestError`] — a stage could not produce its output at all (file is
//!   not a PDF, engine failed to load, parse failed, deadline expired).
//!   Text extraction returns it as `Err`; rasterisation folds it into a
//!   [`crate::output::ConversionResult::Failed`] because the preview is
//!   decorative and must never stop the caller's workflow.
//!
//! * [`PageError`] — **Non-fatal**: one page's text could not be read while
//!   the other pages are fine. Stored inside [`crate::output::PageText`] and
//!   counted as an empty contribution to the document text.
//!
//! Every message is written for the person who uploaded the file: a timeout
//! suggests a smaller file, a parse failure says the file is not a valid PDF.

use crate::engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// All stage-level errors returned by the pdf-ingest library.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared media type is not `application/pdf`.
    #[error("Unsupported file type '{media_type}'. {hint}")]
    UnsupportedType { media_type: String, hint: String },

    /// The byte buffer is empty.
    #[error("The uploaded file '{file_name}' is empty.")]
    EmptyInput { file_name: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read (a directory, an I/O error).
    #[error("Cannot read '{path}': {detail}")]
    ReadFailed { path: PathBuf, detail: String },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The PDF engine could not be loaded.
    #[error("PDF engine unavailable: {detail}")]
    EngineUnavailable { detail: String },

    /// The engine rejected the bytes as a PDF document.
    #[error("This file is not a valid PDF ({detail}). Re-export it as a PDF and upload it again.")]
    CorruptDocument { detail: String },

    /// The PDF is encrypted.
    #[error("This PDF is password protected. Remove the password and upload it again.")]
    PasswordRequired,

    /// Requested page index is outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The render surface for the requested viewport could not be allocated.
    #[error("Cannot allocate a {width}x{height} px surface. Lower the render scale.")]
    SurfaceAllocation { width: u32, height: u32 },

    /// The engine failed while drawing the page.
    #[error("Rendering page {page} failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The rendered surface could not be encoded.
    #[error("Image encoding failed: {detail}")]
    EncodeFailed { detail: String },

    /// A bounded stage exceeded its allotted time.
    #[error("{stage} timed out after {elapsed_ms}ms. Try a smaller or simpler PDF.")]
    Timeout { stage: String, elapsed_ms: u64 },

    // ── Policy errors ─────────────────────────────────────────────────────
    /// Extraction succeeded but produced too little text to analyse.
    #[error(
        "Only {found} characters of text could be read (at least {required} needed). \
The PDF may be a scanned image; export it from the original document instead."
    )]
    InsufficientText { found: usize, required: usize },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The object store refused or failed a write.
    #[error("Failed to store '{name}' in bucket '{bucket}': {detail}")]
    StorageFailed {
        bucket: String,
        name: String,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// `true` for deadline expiries, so callers can tell "try a smaller
    /// file" apart from "this file is broken".
    pub fn is_timeout(&self) -> bool {
        matches!(self, IngestError::Timeout { .. })
    }

    /// Wrap an engine error that happened on page `page` (1-indexed).
    pub(crate) fn from_engine_on_page(err: EngineError, page: usize) -> Self {
        match err {
            EngineError::Render(detail) => IngestError::RenderFailed { page, detail },
            other => other.into(),
        }
    }
}

impl From<EngineError> for IngestError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(detail) => IngestError::EngineUnavailable { detail },
            EngineError::Corrupt(detail) => IngestError::CorruptDocument { detail },
            EngineError::PasswordRequired => IngestError::PasswordRequired,
            EngineError::PageOutOfRange { page, total } => IngestError::PageOutOfRange {
                page: page + 1,
                total,
            },
            EngineError::Render(detail) => IngestError::RenderFailed { page: 0, detail },
            EngineError::Text(detail) | EngineError::Internal(detail) => {
                IngestError::Internal(detail)
            }
        }
    }
}

/// A non-fatal error for a single page's text.
///
/// Stored alongside [`crate::output::PageText`] when a page fails.
/// Extraction continues with the remaining pages.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The engine could not return the page's text content.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextFailed { page: usize, detail: String },
}
