//! PDFium-backed engine.
//!
//! ## Why reopen per operation?
//!
//! `pdfium-render` documents borrow the `Pdfium` binding and wrap a C++
//! library with thread-local state, so they can neither cross an `.await`
//! nor live inside a `Send` trait object. Every operation therefore runs
//! inside `tokio::task::spawn_blocking`, binds the already-located library,
//! parses the shared byte buffer, does its one job, and drops everything.
//!
//! ## Cost and concurrency
//!
//! Each `page_text` call rebinds the library and reparses the document, so
//! extracting an N-page document parses it N + 1 times (once for the open,
//! once per page). With the `thread_safe` feature pdfium-render guards the
//! library with a process-global lock, so blocking tasks against PDFium run
//! one at a time. The pages a text chunk puts "in flight" at once
//! (`chunk_size`) are therefore queued on that lock, not rendered in
//! parallel; the chunking bounds outstanding work and keeps the runtime
//! responsive between chunks, it does not add throughput.
//!
//! The factory binds once during [`EngineFactory::load`] purely to validate
//! the library; a missing or broken library is reported there as
//! [`EngineError::Unavailable`].

use super::{
    EngineDocument, EngineError, EngineFactory, EngineHandle, EngineLoader, PdfEngine,
    RenderSurface, Viewport,
};
use async_trait::async_trait;
use pdfium_locate::{bind_pdfium, resolve_library, LibrarySource};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

static SHARED_LOADER: OnceLock<Arc<EngineLoader>> = OnceLock::new();

/// The process-wide PDFium loader.
///
/// The first caller's `library_path` configures the loader for the life of
/// the process; later callers with a different path get the same loader
/// and a warning.
pub fn shared_loader(library_path: Option<&Path>) -> Arc<EngineLoader> {
    let mut created = false;
    let loader = SHARED_LOADER.get_or_init(|| {
        created = true;
        Arc::new(EngineLoader::new(Arc::new(PdfiumFactory::new(
            library_path.map(Path::to_path_buf),
        ))))
    });
    if !created && library_path.is_some() {
        warn!("PDF engine already configured for this process; ignoring library path override");
    }
    Arc::clone(loader)
}

/// Locates and validates the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumFactory {
    library_path: Option<PathBuf>,
}

impl PdfiumFactory {
    /// `library_path` is the engine's local asset location; `None` defers to
    /// `PDFIUM_LIB_PATH`, the cache directory, then the system library.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

#[async_trait]
impl EngineFactory for PdfiumFactory {
    async fn load(&self) -> Result<EngineHandle, EngineError> {
        let explicit = self.library_path.clone();
        let source = blocking(move || {
            let source = resolve_library(explicit.as_deref())
                .map_err(|e| EngineError::Unavailable(e.to_string()))?;
            bind_pdfium(&source).map_err(|e| EngineError::Unavailable(e.to_string()))?;
            Ok(source)
        })
        .await?;

        info!("PDFium bound from {}", source);
        Ok(Arc::new(PdfiumEngine {
            source: Arc::new(source),
        }))
    }
}

/// A validated pdfium library location.
pub struct PdfiumEngine {
    source: Arc<LibrarySource>,
}

#[async_trait]
impl PdfEngine for PdfiumEngine {
    async fn open(&self, bytes: Arc<[u8]>) -> Result<Arc<dyn EngineDocument>, EngineError> {
        let source = Arc::clone(&self.source);
        let doc_bytes = Arc::clone(&bytes);
        let page_count = blocking(move || {
            with_document(&source, &doc_bytes, |document| Ok(document.pages().len() as usize))
        })
        .await?;

        debug!("PDF parsed: {} pages", page_count);
        Ok(Arc::new(PdfiumDocument {
            source: Arc::clone(&self.source),
            bytes,
            page_count,
        }))
    }
}

struct PdfiumDocument {
    source: Arc<LibrarySource>,
    bytes: Arc<[u8]>,
    page_count: usize,
}

impl PdfiumDocument {
    fn check_index(&self, page_index: usize) -> Result<(), EngineError> {
        if page_index >= self.page_count {
            return Err(EngineError::PageOutOfRange {
                page: page_index,
                total: self.page_count,
            });
        }
        Ok(())
    }

    /// Run `f` against page `page_index` on a blocking thread.
    async fn with_page<T, F>(&self, page_index: usize, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&PdfPage<'_>) -> Result<T, EngineError> + Send + 'static,
    {
        self.check_index(page_index)?;
        let source = Arc::clone(&self.source);
        let bytes = Arc::clone(&self.bytes);
        blocking(move || {
            with_document(&source, &bytes, |document| {
                let page = document
                    .pages()
                    .get(page_index as u16)
                    .map_err(|e| EngineError::Internal(format!("{:?}", e)))?;
                f(&page)
            })
        })
        .await
    }
}

#[async_trait]
impl EngineDocument for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn page_size(&self, page_index: usize) -> Result<(f32, f32), EngineError> {
        self.with_page(page_index, |page| Ok((page.width().value, page.height().value)))
            .await
    }

    async fn render_page(
        &self,
        page_index: usize,
        viewport: Viewport,
    ) -> Result<RenderSurface, EngineError> {
        self.with_page(page_index, move |page| {
            let config = PdfRenderConfig::new()
                .set_target_width(viewport.width as i32)
                .set_target_height(viewport.height as i32);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| EngineError::Render(format!("{:?}", e)))?;
            let image = bitmap.as_image().to_rgba8();
            debug!(
                "Rendered page {} → {}x{} px",
                page_index + 1,
                image.width(),
                image.height()
            );
            Ok(RenderSurface::new(image))
        })
        .await
    }

    async fn page_text(&self, page_index: usize) -> Result<Vec<String>, EngineError> {
        self.with_page(page_index, |page| {
            let text = page
                .text()
                .map_err(|e| EngineError::Text(format!("{:?}", e)))?;
            Ok(text.segments().iter().map(|segment| segment.text()).collect())
        })
        .await
    }
}

/// Bind, parse, and hand the document to `f`.
fn with_document<T>(
    source: &LibrarySource,
    bytes: &[u8],
    f: impl FnOnce(&PdfDocument<'_>) -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    let pdfium = bind_pdfium(source).map_err(|e| EngineError::Unavailable(e.to_string()))?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(classify_load_error)?;
    f(&document)
}

fn classify_load_error(err: PdfiumError) -> EngineError {
    let err_str = format!("{:?}", err);
    if err_str.contains("Password") || err_str.contains("password") {
        EngineError::PasswordRequired
    } else {
        EngineError::Corrupt(err_str)
    }
}

async fn blocking<T, F>(f: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::Internal(format!("engine task panicked: {}", e)))?
}
