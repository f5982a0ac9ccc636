//! Progress-callback trait for ingestion stage events.
//!
//! Attach an [`Arc<dyn IngestProgressCallback>`] with
//! [`crate::Ingestor::with_progress`] to drive a status line, a spinner, or a
//! log sink while a document moves through upload, rasterisation, text
//! extraction and storage.
//!
//! # Example
//!
//! ```rust
//! use pdf_ingest::{IngestProgressCallback, Stage};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct ChunkCounter(AtomicUsize);
//!
//! impl IngestProgressCallback for ChunkCounter {
//!     fn on_chunk(&self, first_page: usize, last_page: usize, total_pages: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Reading pages {}-{} of {}", first_page, last_page, total_pages);
//!     }
//! }
//!
//! let counter = ChunkCounter::default();
//! counter.on_stage_start(Stage::Extract);
//! counter.on_chunk(1, 3, 5);
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! ```

use serde::Serialize;
use std::sync::Arc;

/// The user-visible stages of one ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Persisting the original PDF.
    Upload,
    /// Rendering and encoding the preview.
    Rasterize,
    /// Reading the document text.
    Extract,
    /// Persisting the preview image.
    Store,
}

impl Stage {
    /// Status line shown to the uploader.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Upload => "Uploading the file",
            Stage::Rasterize => "Converting to image",
            Stage::Extract => "Extracting text",
            Stage::Store => "Uploading the image",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the pipeline as stages start, finish or fail.
///
/// Implementations must be `Send + Sync`: rasterisation and extraction run
/// concurrently by default, so events from both may interleave. All methods
/// default to no-ops.
pub trait IngestProgressCallback: Send + Sync {
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// # Arguments
    /// * `elapsed_ms` — wall time spent in the stage
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// A stage failed. For [`Stage::Rasterize`] the pipeline carries on.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// A group of pages is about to be extracted.
    ///
    /// # Arguments
    /// * `first_page`, `last_page` — 1-indexed, inclusive
    /// * `total_pages` — pages in the document
    fn on_chunk(&self, first_page: usize, last_page: usize, total_pages: usize) {
        let _ = (first_page, last_page, total_pages);
    }

    /// One page's text could not be read; it contributes an empty string.
    fn on_page_error(&self, page_num: usize, error: &str) {
        let _ = (page_num, error);
    }
}

/// The default callback: ignores every event.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Shared callback as held by [`crate::Ingestor`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
