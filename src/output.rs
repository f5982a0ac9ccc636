//! Output types produced by the ingestion pipeline.

use crate::error::{IngestError, PageError};
use crate::object_url::ObjectUrl;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// A named, typed image blob derived from the source document.
#[derive(Debug, Clone)]
pub struct DerivedFile {
    /// e.g. `"jane_doe.jpg"` for `"jane_doe.pdf"`.
    pub name: String,
    /// `image/jpeg` or `image/png`.
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl DerivedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// `data:<media_type>;base64,<payload>` for inline embedding.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.bytes))
    }
}

/// Outcome of rasterising one page.
///
/// Either both the image URL and the derived file are present, or only an
/// error message is; there is no half-valid state. The preview is
/// decorative, so failures are values here rather than `Err`.
#[derive(Debug)]
pub enum ConversionResult {
    Converted { image_url: ObjectUrl, file: DerivedFile },
    Failed { error: String },
}

impl ConversionResult {
    pub(crate) fn failed(error: impl ToString) -> Self {
        ConversionResult::Failed {
            error: error.to_string(),
        }
    }

    /// The revocable image URL, or `""` when conversion failed.
    pub fn image_url(&self) -> &str {
        match self {
            ConversionResult::Converted { image_url, .. } => image_url.as_str(),
            ConversionResult::Failed { .. } => "",
        }
    }

    pub fn file(&self) -> Option<&DerivedFile> {
        match self {
            ConversionResult::Converted { file, .. } => Some(file),
            ConversionResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ConversionResult::Converted { .. } => None,
            ConversionResult::Failed { error } => Some(error),
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionResult::Converted { .. })
    }

    /// Revoke the image URL, if any. Safe to call repeatedly.
    pub fn release(&self) {
        if let ConversionResult::Converted { image_url, .. } = self {
            image_url.revoke();
        }
    }
}

impl Serialize for ConversionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ConversionResult", 5)?;
        s.serialize_field("image_url", self.image_url())?;
        s.serialize_field("file_name", &self.file().map(|f| f.name.as_str()))?;
        s.serialize_field("media_type", &self.file().map(|f| f.media_type.as_str()))?;
        s.serialize_field("size", &self.file().map(DerivedFile::size))?;
        s.serialize_field("error", &self.error())?;
        s.end()
    }
}

/// Text read from one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Tokens joined with single spaces; empty when `error` is set.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
}

/// Timing and counts for one [`crate::Ingestor::process`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    /// 0 when the document could not be opened.
    pub page_count: usize,
    pub raster_ms: u64,
    pub extract_ms: u64,
    pub total_ms: u64,
    /// Pages whose text was replaced by an empty contribution.
    pub failed_text_pages: usize,
}

/// Both stage outcomes for one document.
#[derive(Debug)]
pub struct IngestOutcome {
    pub image: ConversionResult,
    pub text: Result<String, IngestError>,
    pub stats: IngestStats,
}

impl IngestOutcome {
    /// The extracted text, provided it has at least `min_chars` characters.
    pub fn require_text(&self, min_chars: usize) -> Result<&str, IngestError> {
        let text = self.text.as_deref().map_err(|e| e.clone())?;
        let found = text.chars().count();
        if found < min_chars {
            return Err(IngestError::InsufficientText {
                found,
                required: min_chars,
            });
        }
        Ok(text)
    }

    /// Revoke the preview's URL.
    pub fn release(&self) {
        self.image.release();
    }
}

impl Serialize for IngestOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("IngestOutcome", 4)?;
        s.serialize_field("image", &self.image)?;
        match &self.text {
            Ok(text) => {
                s.serialize_field("text", text)?;
                s.serialize_field("text_error", &None::<String>)?;
            }
            Err(e) => {
                s.serialize_field("text", &None::<String>)?;
                s.serialize_field("text_error", &Some(e.to_string()))?;
            }
        }
        s.serialize_field("stats", &self.stats)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_url::ObjectUrlRegistry;

    fn converted(reg: &ObjectUrlRegistry) -> ConversionResult {
        let bytes: Arc<[u8]> = Arc::from(vec![0xFFu8, 0xD8, 0xFF]);
        ConversionResult::Converted {
            image_url: reg.create(Arc::clone(&bytes)),
            file: DerivedFile {
                name: "cv.jpg".into(),
                media_type: "image/jpeg".into(),
                bytes,
            },
        }
    }

    #[test]
    fn failed_result_has_no_url_or_file() {
        let r = ConversionResult::failed("PDF conversion timed out");
        assert_eq!(r.image_url(), "");
        assert!(r.file().is_none());
        assert_eq!(r.error(), Some("PDF conversion timed out"));
        assert!(!r.is_converted());
        r.release();
    }

    #[test]
    fn converted_result_release_is_idempotent() {
        let reg = ObjectUrlRegistry::new();
        let r = converted(&reg);
        assert!(r.image_url().starts_with("blob:"));
        assert!(r.error().is_none());
        assert_eq!(r.file().map(DerivedFile::size), Some(3));
        r.release();
        r.release();
        assert_eq!(reg.outstanding(), 0);
    }

    #[test]
    fn data_uri() {
        let f = DerivedFile {
            name: "a.png".into(),
            media_type: "image/png".into(),
            bytes: Arc::from(&b"hi"[..]),
        };
        assert_eq!(f.to_data_uri(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn require_text_enforces_minimum() {
        let outcome = IngestOutcome {
            image: ConversionResult::failed("x"),
            text: Ok("short".into()),
            stats: IngestStats::default(),
        };
        assert_eq!(outcome.require_text(5).unwrap(), "short");
        let err = outcome.require_text(50).unwrap_err();
        assert!(matches!(
            err,
            IngestError::InsufficientText { found: 5, required: 50 }
        ));
    }

    #[test]
    fn require_text_passes_through_extraction_error() {
        let outcome = IngestOutcome {
            image: ConversionResult::failed("x"),
            text: Err(IngestError::PasswordRequired),
            stats: IngestStats::default(),
        };
        assert!(matches!(
            outcome.require_text(0),
            Err(IngestError::PasswordRequired)
        ));
    }

    #[test]
    fn outcome_serialises_without_bytes() {
        let reg = ObjectUrlRegistry::new();
        let outcome = IngestOutcome {
            image: converted(&reg),
            text: Ok("Hello".into()),
            stats: IngestStats {
                page_count: 1,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["image"]["file_name"], "cv.jpg");
        assert_eq!(json["image"]["size"], 3);
        assert_eq!(json["text"], "Hello");
        assert!(json["text_error"].is_null());
        assert_eq!(json["stats"]["page_count"], 1);
    }
}
