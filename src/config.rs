//! Configuration types for the ingestion pipeline.
//!
//! All pipeline behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`]. Every tunable (engine asset path, encode
//! format and quality, per-stage deadlines, chunk size) lives here so it can
//! be changed without touching pipeline logic, serialised for logging, and
//! loaded from a JSON file.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest; setters clamp, `build()` validates.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for document ingestion.
///
/// Built via [`IngestConfig::builder()`] or using [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_ingest::{ImageFormat, IngestConfig};
///
/// let config = IngestConfig::builder()
///     .default_scale(2.0)
///     .image_format(ImageFormat::Png)
///     .chunk_size(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.chunk_size, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Local path of the pdfium shared library. Default: `None`.
    ///
    /// `None` resolves through `PDFIUM_LIB_PATH`, the per-user cache directory,
    /// then the system library path. Only honoured by the first pipeline
    /// built in a process, since the engine is a process-wide singleton.
    pub engine_library_path: Option<PathBuf>,

    /// Preview render scale relative to the page's point size. Range: 0.1–8.0. Default: 1.0.
    ///
    /// 1.0 renders a US-Letter page at 612 × 792 px. Memory and render time
    /// grow with the square of the scale; 2.0 is a good choice for
    /// high-density displays.
    pub default_scale: f32,

    /// Preview encoding. Default: [`ImageFormat::Jpeg`].
    pub image_format: ImageFormat,

    /// Encoder quality, 0.0–1.0. Default: 0.8. Ignored for PNG.
    pub image_quality: f32,

    /// Deadline for parsing the document, in milliseconds. Default: 15 000.
    pub load_timeout_ms: u64,

    /// Deadline for rendering and encoding the preview, in milliseconds. Default: 15 000.
    pub render_timeout_ms: u64,

    /// Deadline for whole-document text extraction, in milliseconds. Default: 20 000.
    pub extract_timeout_ms: u64,

    /// Pages extracted concurrently per group. Default: 3.
    ///
    /// Groups run one after another, capping how many pages the engine holds
    /// at once on long documents. The PDFium backend serialises engine calls,
    /// so this bounds outstanding requests rather than adding parallelism.
    pub chunk_size: usize,

    /// Pause between page groups in milliseconds; 0 only yields. Default: 10.
    pub chunk_pause_ms: u64,

    /// Run rasterisation and extraction concurrently in
    /// [`crate::Ingestor::process`]. Default: true.
    ///
    /// Parallel mode bounds latency by the slower stage instead of the sum.
    pub parallel: bool,

    /// Minimum extracted characters for the text to be worth analysing. Default: 50.
    ///
    /// Enforced by [`crate::Ingestor::process_and_store`] and
    /// [`crate::output::IngestOutcome::require_text`], never by extraction itself.
    pub min_text_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            engine_library_path: None,
            default_scale: 1.0,
            image_format: ImageFormat::default(),
            image_quality: 0.8,
            load_timeout_ms: 15_000,
            render_timeout_ms: 15_000,
            extract_timeout_ms: 20_000,
            chunk_size: 3,
            chunk_pause_ms: 10,
            parallel: true,
            min_text_chars: 50,
        }
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Continue adjusting an existing config through the builder.
    pub fn into_builder(self) -> IngestConfigBuilder {
        IngestConfigBuilder { config: self }
    }

    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, IngestError> {
        let config: IngestConfig = serde_json::from_str(json)
            .map_err(|e| IngestError::InvalidConfig(format!("config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_millis(self.extract_timeout_ms)
    }

    pub fn chunk_pause(&self) -> Duration {
        Duration::from_millis(self.chunk_pause_ms)
    }

    fn validate(&self) -> Result<(), IngestError> {
        if !(0.1..=8.0).contains(&self.default_scale) {
            return Err(IngestError::InvalidConfig(format!(
                "scale must be 0.1–8.0, got {}",
                self.default_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.image_quality) {
            return Err(IngestError::InvalidConfig(format!(
                "image quality must be 0.0–1.0, got {}",
                self.image_quality
            )));
        }
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidConfig("chunk size must be ≥ 1".into()));
        }
        for (name, ms) in [
            ("load", self.load_timeout_ms),
            ("render", self.render_timeout_ms),
            ("extract", self.extract_timeout_ms),
        ] {
            if ms == 0 {
                return Err(IngestError::InvalidConfig(format!(
                    "{name} timeout must be > 0 ms"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn engine_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.engine_library_path = Some(path.into());
        self
    }

    pub fn default_scale(mut self, scale: f32) -> Self {
        self.config.default_scale = scale.clamp(0.1, 8.0);
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn image_quality(mut self, quality: f32) -> Self {
        self.config.image_quality = quality.clamp(0.0, 1.0);
        self
    }

    pub fn load_timeout_ms(mut self, ms: u64) -> Self {
        self.config.load_timeout_ms = ms;
        self
    }

    pub fn render_timeout_ms(mut self, ms: u64) -> Self {
        self.config.render_timeout_ms = ms;
        self
    }

    pub fn extract_timeout_ms(mut self, ms: u64) -> Self {
        self.config.extract_timeout_ms = ms;
        self
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.config.chunk_size = n.max(1);
        self
    }

    pub fn chunk_pause_ms(mut self, ms: u64) -> Self {
        self.config.chunk_pause_ms = ms;
        self
    }

    pub fn parallel(mut self, v: bool) -> Self {
        self.config.parallel = v;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding of the preview image.
///
/// | Format | Use case |
/// |--------|----------|
/// | Png    | Lossless; crisp text, larger files |
/// | Jpeg   | Lossy at `image_quality`; small uploads (default) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    #[default]
    Jpeg,
}

impl ImageFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(IngestError::InvalidConfig(format!(
                "unknown image format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}
