//! The pipeline coordinator.
//!
//! [`Ingestor`] owns everything that outlives a single document: the
//! configuration, the engine loader, the object-URL registry and the
//! progress callback. Each document call reads the caller's
//! [`SourceDocument`] and keeps nothing from it afterwards.
//!
//! ## Partial failure
//!
//! [`Ingestor::process`] always returns both outcomes. A missing preview is
//! tolerable; missing or too-short text is not, and that policy is applied
//! by [`Ingestor::process_and_store`] or by the caller through
//! [`IngestOutcome::require_text`], never by the stages themselves.

use crate::config::IngestConfig;
use crate::engine::{pdfium, EngineLoader};
use crate::error::IngestError;
use crate::object_url::ObjectUrlRegistry;
use crate::output::{ConversionResult, IngestOutcome, IngestStats, PageText};
use crate::pipeline::{extract, input::SourceDocument, render};
use crate::progress::{NoopProgressCallback, ProgressCallback, Stage};
use crate::store::{ObjectStore, IMAGES_BUCKET, RESUMES_BUCKET};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runs the ingestion pipeline. Cheap to clone; clones share the engine and
/// the URL registry.
#[derive(Clone)]
pub struct Ingestor {
    config: IngestConfig,
    loader: Arc<EngineLoader>,
    urls: ObjectUrlRegistry,
    progress: ProgressCallback,
}

/// What [`Ingestor::process_and_store`] persisted.
#[derive(Debug, Clone, Serialize)]
pub struct StoredResume {
    /// Stored path of the original PDF.
    pub resume_path: String,
    /// Stored path of the preview, `None` when no preview could be produced
    /// or stored.
    pub image_path: Option<String>,
    /// Extracted text, at least `min_text_chars` long.
    pub text: String,
    pub stats: IngestStats,
}

impl Ingestor {
    /// Use the process-wide PDFium engine.
    pub fn new(config: IngestConfig) -> Self {
        let loader = pdfium::shared_loader(config.engine_library_path.as_deref());
        Self::with_loader(config, loader)
    }

    /// Use a specific engine loader.
    pub fn with_loader(config: IngestConfig, loader: Arc<EngineLoader>) -> Self {
        Self {
            config,
            loader,
            urls: ObjectUrlRegistry::new(),
            progress: Arc::new(NoopProgressCallback),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn loader(&self) -> &EngineLoader {
        &self.loader
    }

    /// Registry holding the URLs of produced previews.
    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    pub(crate) fn progress(&self) -> &ProgressCallback {
        &self.progress
    }

    /// Render one page to a preview image.
    ///
    /// Never fails: errors are reported through [`ConversionResult::Failed`].
    /// The caller owns the returned image URL and should revoke it with
    /// [`ConversionResult::release`] once the image is persisted or discarded.
    pub async fn rasterize_page(
        &self,
        doc: &SourceDocument,
        page_index: usize,
        scale: Option<f32>,
    ) -> ConversionResult {
        self.progress.on_stage_start(Stage::Rasterize);
        let started = Instant::now();
        let result = render::rasterize_page(self, doc, page_index, scale).await;
        match result.error() {
            None => self
                .progress
                .on_stage_complete(Stage::Rasterize, elapsed_ms(started)),
            Some(e) => self.progress.on_stage_error(Stage::Rasterize, e),
        }
        result
    }

    /// Per-page text in document order.
    pub async fn extract_pages(&self, doc: &SourceDocument) -> Result<Vec<PageText>, IngestError> {
        self.progress.on_stage_start(Stage::Extract);
        let started = Instant::now();
        let pages = extract::extract_pages(self, doc).await;
        match &pages {
            Ok(_) => self
                .progress
                .on_stage_complete(Stage::Extract, elapsed_ms(started)),
            Err(e) => self.progress.on_stage_error(Stage::Extract, &e.to_string()),
        }
        pages
    }

    /// The whole document's text, pages separated by `\n`, trimmed.
    pub async fn extract_text(&self, doc: &SourceDocument) -> Result<String, IngestError> {
        let pages = self.extract_pages(doc).await?;
        Ok(extract::join_pages(&pages))
    }

    /// Produce the first-page preview and the text.
    ///
    /// With `config.parallel` both stages run concurrently, so latency is
    /// that of the slower stage.
    pub async fn process(&self, doc: &SourceDocument) -> IngestOutcome {
        let started = Instant::now();

        let raster = async {
            let t = Instant::now();
            let image = self.rasterize_page(doc, 0, None).await;
            (image, elapsed_ms(t))
        };
        let extract = async {
            let t = Instant::now();
            let pages = self.extract_pages(doc).await;
            (pages, elapsed_ms(t))
        };

        let ((image, raster_ms), (pages, extract_ms)) = if self.config.parallel {
            futures::join!(raster, extract)
        } else {
            let r = raster.await;
            (r, extract.await)
        };

        let mut stats = IngestStats {
            raster_ms,
            extract_ms,
            total_ms: elapsed_ms(started),
            ..Default::default()
        };
        let text = pages.map(|pages| {
            stats.page_count = pages.len();
            stats.failed_text_pages = pages.iter().filter(|p| p.error.is_some()).count();
            extract::join_pages(&pages)
        });

        info!(
            "Processed '{}': preview {}, text {}, {}ms",
            doc.file_name,
            if image.is_converted() { "ok" } else { "failed" },
            match &text {
                Ok(t) => format!("{} chars", t.chars().count()),
                Err(_) => "failed".to_string(),
            },
            stats.total_ms
        );

        IngestOutcome { image, text, stats }
    }

    /// The upload flow: store the PDF, process it, store the preview, and
    /// return the text if there is enough of it.
    ///
    /// A failed or unstorable preview is logged and skipped. The preview's
    /// URL is revoked before this returns, on every path.
    pub async fn process_and_store(
        &self,
        doc: &SourceDocument,
        store: &dyn ObjectStore,
    ) -> Result<StoredResume, IngestError> {
        doc.ensure_pdf()?;

        self.progress.on_stage_start(Stage::Upload);
        let t = Instant::now();
        let resume_path = match store
            .put(
                RESUMES_BUCKET,
                &doc.file_name,
                &doc.media_type,
                Arc::clone(&doc.bytes),
            )
            .await
        {
            Ok(path) => {
                self.progress.on_stage_complete(Stage::Upload, elapsed_ms(t));
                path
            }
            Err(e) => {
                self.progress.on_stage_error(Stage::Upload, &e.to_string());
                return Err(e);
            }
        };

        let outcome = self.process(doc).await;
        let image_path = match outcome.image.file() {
            Some(file) => {
                self.progress.on_stage_start(Stage::Store);
                let t = Instant::now();
                match store
                    .put(IMAGES_BUCKET, &file.name, &file.media_type, Arc::clone(&file.bytes))
                    .await
                {
                    Ok(path) => {
                        self.progress.on_stage_complete(Stage::Store, elapsed_ms(t));
                        Some(path)
                    }
                    Err(e) => {
                        warn!("Preview not stored, continuing without it: {}", e);
                        self.progress.on_stage_error(Stage::Store, &e.to_string());
                        None
                    }
                }
            }
            None => None,
        };
        outcome.release();

        let text = outcome.require_text(self.config.min_text_chars)?.to_string();
        Ok(StoredResume {
            resume_path,
            image_path,
            text,
            stats: outcome.stats,
        })
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("config", &self.config)
            .field("loader", &self.loader)
            .field("urls", &self.urls)
            .finish()
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
