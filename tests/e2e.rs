//! End-to-end tests against the real PDFium engine.
//!
//! Gated behind `PDFIUM_E2E` so they only run where a pdfium library is
//! installed. The library is found through `PDFIUM_LIB_PATH`, the cache
//! directory, or the system library path.
//!
//! Run with:
//!   PDFIUM_E2E=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture

use pdf_ingest::{ImageFormat, IngestConfig, IngestError, Ingestor, LocalDirStore, SourceDocument};
use tokio_test::{assert_err, assert_ok};

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("PDFIUM_E2E").is_err() {
            println!("SKIP — set PDFIUM_E2E=1 to run e2e tests");
            return;
        }
    };
}

/// A letter-sized PDF with one Helvetica line per page.
fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let n = lines.len();
    let font_id = 3 + 2 * n;
    let mut objects: Vec<String> = Vec::new();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    for (i, line) in lines.iter().enumerate() {
        let page_id = 3 + 2 * i;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {} 0 R >>",
            page_id + 1
        ));
        let stream = format!("BT /F1 24 Tf 72 700 Td ({line}) Tj ET");
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }
    let xref_at = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for off in offsets {
        out.push_str(&format!("{off:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.into_bytes()
}

#[tokio::test]
async fn e2e_hello_world() {
    e2e_skip_unless_enabled!();
    let ingestor = Ingestor::new(IngestConfig::default());
    let doc = SourceDocument::pdf(text_pdf(&["Hello", "World"]), "hello.pdf");

    let text = assert_ok!(ingestor.extract_text(&doc).await);
    assert_eq!(text, "Hello\nWorld");

    let result = ingestor.rasterize_page(&doc, 0, None).await;
    assert!(result.error().is_none(), "error: {:?}", result.error());
    let file = result.file().expect("preview");
    assert_eq!(file.media_type, ImageFormat::Jpeg.media_type());
    let img = image::load_from_memory(&file.bytes).unwrap();
    assert_eq!((img.width(), img.height()), (612, 792));
    result.release();
    assert_eq!(ingestor.object_urls().outstanding(), 0);
}

#[tokio::test]
async fn e2e_corrupt_input() {
    e2e_skip_unless_enabled!();
    let ingestor = Ingestor::new(IngestConfig::default());
    let doc = SourceDocument::pdf(b"%PDF-1.4\nnot really a pdf".to_vec(), "bad.pdf");

    let result = ingestor.rasterize_page(&doc, 0, None).await;
    assert_eq!(result.image_url(), "");
    assert!(result.file().is_none());
    assert!(result.error().is_some());

    let err = assert_err!(ingestor.extract_text(&doc).await);
    assert!(matches!(err, IngestError::CorruptDocument { .. }), "got: {err}");
}

#[tokio::test]
async fn e2e_process_and_store() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalDirStore::new(dir.path());
    let ingestor = Ingestor::new(IngestConfig::default());
    let lines = [
        "Jane Doe, Senior Software Engineer",
        "Ten years building distributed storage systems",
    ];
    let doc = SourceDocument::pdf(text_pdf(&lines), "jane_doe.pdf");

    let stored = assert_ok!(ingestor.process_and_store(&doc, &store).await);
    println!("{:#?}", stored);
    assert!(stored.text.contains("Jane Doe"));
    assert!(stored.image_path.is_some());
    assert_eq!(ingestor.object_urls().outstanding(), 0);
}
