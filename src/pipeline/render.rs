//! Page rasterisation: one page → encoded preview image + revocable URL.
//!
//! Every failure here (unsupported input, engine unavailable, corrupt PDF,
//! oversized surface, encode error, deadline) is folded into
//! [`ConversionResult::Failed`]. The preview is cosmetic; callers carry on
//! without it.
//!
//! ## Deadlines
//!
//! Parsing is bounded by `load_timeout_ms`. Rendering and encoding together
//! are bounded by `render_timeout_ms`. When a deadline fires, the in-flight
//! future is dropped and with it the render surface it owned.

use crate::engine::{EngineDocument, Viewport};
use crate::error::IngestError;
use crate::ingest::Ingestor;
use crate::output::{ConversionResult, DerivedFile};
use crate::pipeline::deadline::bounded_try;
use crate::pipeline::encode::{derived_file_name, encode_surface};
use crate::pipeline::input::SourceDocument;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Largest surface we will ask the engine for, in pixels.
pub const MAX_SURFACE_PIXELS: u64 = 16_384 * 16_384;

/// Rasterise `page_index` (0-based) of `doc` at `scale`, or at the configured
/// default scale when `None`.
pub async fn rasterize_page(
    ingestor: &Ingestor,
    doc: &SourceDocument,
    page_index: usize,
    scale: Option<f32>,
) -> ConversionResult {
    match try_rasterize(ingestor, doc, page_index, scale).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Preview for '{}' failed: {}", doc.file_name, e);
            ConversionResult::failed(e)
        }
    }
}

async fn try_rasterize(
    ingestor: &Ingestor,
    doc: &SourceDocument,
    page_index: usize,
    scale: Option<f32>,
) -> Result<ConversionResult, IngestError> {
    doc.ensure_pdf()?;
    let config = ingestor.config();
    let scale = scale.unwrap_or(config.default_scale).clamp(0.1, 8.0);

    let engine = ingestor.loader().acquire().await?;
    let document = bounded_try(
        "PDF loading",
        config.load_timeout(),
        engine.open(Arc::clone(&doc.bytes)),
    )
    .await?;

    let bytes = bounded_try(
        "PDF conversion",
        config.render_timeout(),
        render_and_encode(ingestor, document.as_ref(), page_index, scale),
    )
    .await?;

    let format = config.image_format;
    let bytes: Arc<[u8]> = Arc::from(bytes);
    let file = DerivedFile {
        name: derived_file_name(&doc.file_name, format),
        media_type: format.media_type().to_string(),
        bytes: Arc::clone(&bytes),
    };
    let image_url = ingestor.object_urls().create(bytes);
    info!(
        "Preview ready: {} ({} bytes) at {}",
        file.name,
        file.size(),
        image_url
    );
    Ok(ConversionResult::Converted { image_url, file })
}

async fn render_and_encode(
    ingestor: &Ingestor,
    document: &dyn EngineDocument,
    page_index: usize,
    scale: f32,
) -> Result<Vec<u8>, IngestError> {
    let total = document.page_count();
    if page_index >= total {
        return Err(IngestError::PageOutOfRange {
            page: page_index + 1,
            total,
        });
    }
    let page_num = page_index + 1;

    let (width_pt, height_pt) = document
        .page_size(page_index)
        .await
        .map_err(|e| IngestError::from_engine_on_page(e, page_num))?;
    let viewport = Viewport::for_page(width_pt, height_pt, scale);
    if viewport.pixel_count() > MAX_SURFACE_PIXELS {
        return Err(IngestError::SurfaceAllocation {
            width: viewport.width,
            height: viewport.height,
        });
    }
    debug!(
        "Rendering page {} at {}x → {}x{} px",
        page_num, scale, viewport.width, viewport.height
    );

    let mut surface = document
        .render_page(page_index, viewport)
        .await
        .map_err(|e| IngestError::from_engine_on_page(e, page_num))?;

    let config = ingestor.config();
    let encoded = encode_surface(&mut surface, config.image_format, config.image_quality).await;
    debug_assert!(surface.is_released());
    encoded
}
