//! # pdf-ingest
//!
//! Turn an uploaded PDF resume into a preview image and plain text, under
//! per-stage deadlines, without letting one failing stage sink the other.
//!
//! ## Pipeline Overview
//!
//! ```text
//! SourceDocument (bytes + media type + name)
//!  │
//!  ├─ 1. Gate     reject non-PDF uploads before the engine loads
//!  ├─ 2. Engine   lazy, single-flight PDFium load shared by the process
//!  ├─ 3. Render   page 1 → RGBA surface → JPEG/PNG → blob: URL
//!  ├─ 4. Extract  page tokens in chunks of 3, joined in page order
//!  └─ 5. Outcome  preview result + text + timings
//! ```
//!
//! Rendering and extraction run concurrently by default. A failed preview
//! is reported as a value; text failures are errors, because nothing
//! downstream can work without the text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_ingest::{IngestConfig, Ingestor, SourceDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ingestor = Ingestor::new(IngestConfig::default());
//!     let doc = SourceDocument::from_path("resume.pdf").await?;
//!
//!     let outcome = ingestor.process(&doc).await;
//!     if let Some(err) = outcome.image.error() {
//!         eprintln!("no preview: {err}");
//!     }
//!     println!("{}", outcome.require_text(50)?);
//!     outcome.release();
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-ingest` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Engine library
//!
//! PDFium is loaded from `IngestConfig::engine_library_path`, then
//! `PDFIUM_LIB_PATH`, then the per-user cache directory, then the system
//! library path. Nothing is downloaded at runtime.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod object_url;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ImageFormat, IngestConfig, IngestConfigBuilder};
pub use engine::{EngineError, EngineHandle, EngineLoader};
pub use error::{IngestError, PageError};
pub use ingest::{Ingestor, StoredResume};
pub use object_url::{ObjectUrl, ObjectUrlRegistry};
pub use output::{ConversionResult, DerivedFile, IngestOutcome, IngestStats, PageText};
pub use pipeline::input::SourceDocument;
pub use progress::{IngestProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use store::{LocalDirStore, ObjectStore};
