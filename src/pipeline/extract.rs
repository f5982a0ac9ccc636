//! Text extraction: every page's tokens, in page order.
//!
//! Pages are read in groups of `chunk_size`. Pages inside a group are
//! fetched concurrently; groups run one after another with a short pause in
//! between, which caps how much engine work is in flight on long documents.
//! `join_all` yields results in input order, so the assembled text follows
//! document order whatever order the pages complete in.
//!
//! A page whose text cannot be read contributes an empty string and a
//! [`PageError`]; it never aborts the document. Only unsupported input,
//! engine failure, parse failure and the whole-document deadline are errors.

use crate::engine::EngineDocument;
use crate::error::{IngestError, PageError};
use crate::ingest::Ingestor;
use crate::output::PageText;
use crate::pipeline::deadline::bounded_try;
use crate::pipeline::input::SourceDocument;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-page text for `doc`, in page order.
pub async fn extract_pages(
    ingestor: &Ingestor,
    doc: &SourceDocument,
) -> Result<Vec<PageText>, IngestError> {
    doc.ensure_pdf()?;
    let config = ingestor.config();
    let engine = ingestor.loader().acquire().await?;

    bounded_try("Text extraction", config.extract_timeout(), async {
        let document = bounded_try(
            "PDF loading",
            config.load_timeout(),
            engine.open(Arc::clone(&doc.bytes)),
        )
        .await?;
        Ok::<_, IngestError>(read_pages(ingestor, document.as_ref()).await)
    })
    .await
}

/// The document's text: page texts joined with `\n`, trimmed.
pub async fn extract_text(ingestor: &Ingestor, doc: &SourceDocument) -> Result<String, IngestError> {
    let pages = extract_pages(ingestor, doc).await?;
    Ok(join_pages(&pages))
}

pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

async fn read_pages(ingestor: &Ingestor, document: &dyn EngineDocument) -> Vec<PageText> {
    let config = ingestor.config();
    let progress = ingestor.progress();
    let total = document.page_count();
    let indices: Vec<usize> = (0..total).collect();
    let mut pages = Vec::with_capacity(total);

    for (n, group) in indices.chunks(config.chunk_size.max(1)).enumerate() {
        if n > 0 {
            if config.chunk_pause_ms == 0 {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(config.chunk_pause()).await;
            }
        }

        let (first, last) = (group[0] + 1, group[group.len() - 1] + 1);
        debug!("Extracting pages {}-{} of {}", first, last, total);
        progress.on_chunk(first, last, total);

        let texts = join_all(group.iter().map(|&i| read_page(ingestor, document, i))).await;
        pages.extend(texts);
    }

    let failed = pages.iter().filter(|p| p.error.is_some()).count();
    info!(
        "Extracted text from {}/{} pages",
        total - failed,
        total
    );
    pages
}

async fn read_page(ingestor: &Ingestor, document: &dyn EngineDocument, index: usize) -> PageText {
    let page_num = index + 1;
    match document.page_text(index).await {
        Ok(tokens) => PageText {
            page_num,
            text: tokens.join(" "),
            error: None,
        },
        Err(e) => {
            let error = PageError::TextFailed {
                page: page_num,
                detail: e.to_string(),
            };
            warn!("{}", error);
            ingestor.progress().on_page_error(page_num, &error.to_string());
            PageText {
                page_num,
                text: String::new(),
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, text: &str) -> PageText {
        PageText {
            page_num: n,
            text: text.into(),
            error: None,
        }
    }

    #[test]
    fn join_pages_newline_and_trim() {
        let pages = vec![page(1, "  Hello"), page(2, "World  ")];
        assert_eq!(join_pages(&pages), "Hello\nWorld");
    }

    #[test]
    fn failed_page_contributes_empty_line() {
        let pages = vec![page(1, "a"), page(2, ""), page(3, "c")];
        assert_eq!(join_pages(&pages), "a\n\nc");
    }

    #[test]
    fn no_pages_is_empty() {
        assert_eq!(join_pages(&[]), "");
    }
}
