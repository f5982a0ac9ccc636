//! Image encoding: `RenderSurface` → compressed preview bytes.
//!
//! JPEG is the default because previews are uploaded and displayed as
//! thumbnails, where size matters more than crisp glyph edges. PNG stays
//! available for callers who want a lossless page image.

use crate::config::ImageFormat;
use crate::engine::RenderSurface;
use crate::error::IngestError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use tracing::debug;

static PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// Encode a rendered surface on a blocking thread.
///
/// The pixel buffer is moved out of `surface`, which is left released
/// whether or not encoding succeeds. `quality` is 0.0–1.0 and maps to JPEG
/// quality 1–100; PNG ignores it.
pub async fn encode_surface(
    surface: &mut RenderSurface,
    format: ImageFormat,
    quality: f32,
) -> Result<Vec<u8>, IngestError> {
    let pixels = surface
        .take_pixels()
        .ok_or_else(|| IngestError::EncodeFailed {
            detail: "surface already released".into(),
        })?;

    tokio::task::spawn_blocking(move || encode_pixels(pixels, format, quality))
        .await
        .map_err(|e| IngestError::Internal(format!("encode task panicked: {}", e)))?
}

fn encode_pixels(
    pixels: RgbaImage,
    format: ImageFormat,
    quality: f32,
) -> Result<Vec<u8>, IngestError> {
    let encode_err = |e: image::ImageError| IngestError::EncodeFailed {
        detail: e.to_string(),
    };
    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => {
            DynamicImage::ImageRgba8(pixels)
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(encode_err)?;
        }
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel; the RGBA buffer is dropped here.
            let rgb = DynamicImage::ImageRgba8(pixels).into_rgb8();
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality))
                .encode_image(&rgb)
                .map_err(encode_err)?;
        }
    }
    debug!("Encoded preview → {} bytes {:?}", buf.len(), format);
    Ok(buf)
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}

/// Name for the preview image: the source name without a trailing `.pdf`,
/// plus the format's extension.
pub fn derived_file_name(source_name: &str, format: ImageFormat) -> String {
    let stem = PDF_SUFFIX.replace(source_name.trim(), "");
    let stem = if stem.is_empty() { "document" } else { stem.as_ref() };
    format!("{}.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn surface() -> RenderSurface {
        RenderSurface::new(RgbaImage::from_pixel(16, 8, Rgba([200, 10, 10, 255])))
    }

    #[tokio::test]
    async fn jpeg_output_decodes() {
        let mut s = surface();
        let bytes = encode_surface(&mut s, ImageFormat::Jpeg, 0.8).await.unwrap();
        assert!(s.is_released());
        assert_eq!((s.width(), s.height()), (0, 0));
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[tokio::test]
    async fn png_output_decodes() {
        let bytes = encode_surface(&mut surface(), ImageFormat::Png, 0.0).await.unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[tokio::test]
    async fn released_surface_cannot_be_encoded() {
        let mut s = surface();
        s.release();
        let err = encode_surface(&mut s, ImageFormat::Png, 1.0).await.unwrap_err();
        assert!(matches!(err, IngestError::EncodeFailed { .. }));
    }

    #[tokio::test]
    async fn failed_encode_still_releases_surface() {
        // Wider than JPEG's 65535-pixel limit.
        let mut s = RenderSurface::new(RgbaImage::new(70_000, 1));
        let err = encode_surface(&mut s, ImageFormat::Jpeg, 0.8).await.unwrap_err();
        assert!(matches!(err, IngestError::EncodeFailed { .. }));
        assert!(s.is_released());
        assert!(s.pixels().is_none());
    }

    #[test]
    fn quality_mapping() {
        assert_eq!(jpeg_quality(0.8), 80);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(2.0), 100);
    }

    #[test]
    fn derived_names() {
        assert_eq!(derived_file_name("jane_doe.pdf", ImageFormat::Jpeg), "jane_doe.jpg");
        assert_eq!(derived_file_name("CV.PDF", ImageFormat::Png), "CV.png");
        assert_eq!(derived_file_name("notes.pdf.txt", ImageFormat::Png), "notes.pdf.txt.png");
        assert_eq!(derived_file_name(".pdf", ImageFormat::Jpeg), "document.jpg");
        assert_eq!(derived_file_name("", ImageFormat::Jpeg), "document.jpg");
    }
}
