//! Pipeline stages for document ingestion.
//!
//! Each submodule implements one step; [`crate::Ingestor`] wires them
//! together.
//!
//! ## Data Flow
//!
//! ```text
//!                ┌─▶ render ──▶ encode ──▶ preview (ConversionResult)
//! input (bytes) ─┤
//!                └─▶ extract ───────────▶ text (String)
//! ```
//!
//! 1. [`input`]    — the uploaded bytes, declared media type and file name;
//!    rejects non-PDF uploads before the engine is touched
//! 2. [`render`]   — render one page onto a surface sized from the page's
//!    point dimensions × scale
//! 3. [`encode`]   — JPEG/PNG-encode the surface and name the derived file
//! 4. [`extract`]  — read page text in chunks, in page order
//! 5. [`deadline`] — the shared timer race used by render and extract

pub mod deadline;
pub mod encode;
pub mod extract;
pub mod input;
pub mod render;
