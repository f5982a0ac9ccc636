//! The PDF engine seam: parse documents, render pages, read text tokens.
//!
//! Pipeline code never names a concrete engine. It asks an
//! [`loader::EngineLoader`] for an [`EngineHandle`] and talks to the
//! [`PdfEngine`] / [`EngineDocument`] traits, so the PDFium backend in
//! [`pdfium`] can be replaced by a scripted engine in tests without touching
//! the rasteriser or the extractor.
//!
//! Every method that can block on the engine is `async`: they are the
//! suspension points at which a deadline from
//! [`crate::pipeline::deadline`] can fire.

pub mod loader;
pub mod pdfium;

use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;
use thiserror::Error;

pub use loader::EngineLoader;

/// Shared handle to a loaded engine. Read-only once loaded.
pub type EngineHandle = Arc<dyn PdfEngine>;

/// Engine-level failures. Cloneable so a single failed load can be handed to
/// every waiter of the shared load future.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("engine failed to load: {0}")]
    Unavailable(String),

    #[error("document could not be parsed: {0}")]
    Corrupt(String),

    #[error("document is encrypted")]
    PasswordRequired,

    /// `page` is 0-indexed.
    #[error("page index {page} out of range ({total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("render failed: {0}")]
    Render(String),

    #[error("text content unavailable: {0}")]
    Text(String),

    #[error("{0}")]
    Internal(String),
}

/// Builds an engine. Called at most once per load cycle by
/// [`EngineLoader`].
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn load(&self) -> Result<EngineHandle, EngineError>;
}

/// A loaded PDF engine.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Parse a document from raw bytes.
    async fn open(&self, bytes: Arc<[u8]>) -> Result<Arc<dyn EngineDocument>, EngineError>;
}

/// An opened document. Lives only for the duration of one pipeline call.
#[async_trait]
pub trait EngineDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Intrinsic page size in PDF points (1/72 inch), `(width, height)`.
    async fn page_size(&self, page_index: usize) -> Result<(f32, f32), EngineError>;

    /// Render `page_index` onto a surface exactly `viewport` sized.
    async fn render_page(
        &self,
        page_index: usize,
        viewport: Viewport,
    ) -> Result<RenderSurface, EngineError>;

    /// The page's text tokens in the engine's native order.
    async fn page_text(&self, page_index: usize) -> Result<Vec<String>, EngineError>;
}

/// Pixel dimensions of a page rendered at `scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl Viewport {
    /// Scale intrinsic point dimensions linearly; never smaller than 1×1.
    pub fn for_page(width_pt: f32, height_pt: f32, scale: f32) -> Self {
        let px = |pt: f32| (pt * scale).floor().max(1.0) as u32;
        Self {
            width: px(width_pt),
            height: px(height_pt),
            scale,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A transient RGBA pixel buffer, owned by one rasterisation call.
#[derive(Debug)]
pub struct RenderSurface {
    width: u32,
    height: u32,
    pixels: Option<RgbaImage>,
}

impl RenderSurface {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            pixels: Some(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `None` once released.
    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }

    /// Move the pixel buffer out, leaving the surface released.
    pub fn take_pixels(&mut self) -> Option<RgbaImage> {
        self.width = 0;
        self.height = 0;
        self.pixels.take()
    }

    /// Zero the dimensions and drop the pixel buffer. Idempotent.
    pub fn release(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels = None;
    }

    pub fn is_released(&self) -> bool {
        self.pixels.is_none()
    }
}
