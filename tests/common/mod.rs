//! A scripted in-memory PDF engine for pipeline tests.
//!
//! Documents are "parsed" by checking the `%PDF` magic; page sizes, text
//! tokens and per-call behaviour (delay, failure, never resolving) come from
//! a [`Script`]. Counters record engine loads and in-flight text requests.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use pdf_ingest::engine::{
    EngineDocument, EngineError, EngineFactory, EngineHandle, EngineLoader, PdfEngine,
    RenderSurface, Viewport,
};
use pdf_ingest::{IngestConfig, Ingestor, SourceDocument};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const LETTER: (f32, f32) = (612.0, 792.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Ok,
    Delay(Duration),
    Fail,
    Hang,
}

impl Behavior {
    async fn apply(self, what: &str) -> Result<(), EngineError> {
        match self {
            Behavior::Ok => Ok(()),
            Behavior::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
            Behavior::Fail => Err(EngineError::Text(format!("scripted {what} failure"))),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedPage {
    pub size: (f32, f32),
    pub tokens: Vec<String>,
    pub text: Behavior,
}

impl ScriptedPage {
    pub fn with_text(text: &str) -> Self {
        Self {
            size: LETTER,
            tokens: text.split_whitespace().map(str::to_string).collect(),
            text: Behavior::Ok,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Script {
    pub pages: Vec<ScriptedPage>,
    pub open: Behavior,
    pub render: Behavior,
    /// Fail this many engine loads before succeeding.
    pub load_failures: usize,
    pub load_delay: Duration,
}

impl Script {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            pages,
            open: Behavior::Ok,
            render: Behavior::Ok,
            load_failures: 0,
            load_delay: Duration::ZERO,
        }
    }

    /// Two letter-sized pages reading "Hello" and "World".
    pub fn hello_world() -> Self {
        Self::new(vec![
            ScriptedPage::with_text("Hello"),
            ScriptedPage::with_text("World"),
        ])
    }

    /// `n` pages whose text is "Page <i> of the scripted resume".
    pub fn numbered(n: usize) -> Self {
        Self::new(
            (1..=n)
                .map(|i| ScriptedPage::with_text(&format!("Page {i} of the scripted resume")))
                .collect(),
        )
    }
}

#[derive(Default)]
pub struct Counters {
    pub loads: AtomicUsize,
    pub opens: AtomicUsize,
    pub renders: AtomicUsize,
    pub text_in_flight: AtomicUsize,
    pub text_peak: AtomicUsize,
}

impl Counters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn text_peak(&self) -> usize {
        self.text_peak.load(Ordering::SeqCst)
    }
}

pub struct ScriptedFactory {
    script: Arc<Script>,
    counters: Arc<Counters>,
}

#[async_trait]
impl EngineFactory for ScriptedFactory {
    async fn load(&self) -> Result<EngineHandle, EngineError> {
        let n = self.counters.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.script.load_delay).await;
        if n < self.script.load_failures {
            return Err(EngineError::Unavailable(format!("scripted load failure {n}")));
        }
        Ok(Arc::new(ScriptedEngine {
            script: Arc::clone(&self.script),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ScriptedEngine {
    script: Arc<Script>,
    counters: Arc<Counters>,
}

#[async_trait]
impl PdfEngine for ScriptedEngine {
    async fn open(&self, bytes: Arc<[u8]>) -> Result<Arc<dyn EngineDocument>, EngineError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.script.open.apply("open").await?;
        if !bytes.starts_with(b"%PDF") {
            return Err(EngineError::Corrupt("no PDF header".into()));
        }
        Ok(Arc::new(ScriptedDocument {
            script: Arc::clone(&self.script),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ScriptedDocument {
    script: Arc<Script>,
    counters: Arc<Counters>,
}

impl ScriptedDocument {
    fn page(&self, index: usize) -> Result<&ScriptedPage, EngineError> {
        self.script.pages.get(index).ok_or(EngineError::PageOutOfRange {
            page: index,
            total: self.script.pages.len(),
        })
    }
}

/// Decrements the in-flight counter however the text future ends.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngineDocument for ScriptedDocument {
    fn page_count(&self) -> usize {
        self.script.pages.len()
    }

    async fn page_size(&self, page_index: usize) -> Result<(f32, f32), EngineError> {
        Ok(self.page(page_index)?.size)
    }

    async fn render_page(
        &self,
        page_index: usize,
        viewport: Viewport,
    ) -> Result<RenderSurface, EngineError> {
        self.page(page_index)?;
        self.counters.renders.fetch_add(1, Ordering::SeqCst);
        self.script
            .render
            .apply("render")
            .await
            .map_err(|e| EngineError::Render(e.to_string()))?;
        Ok(RenderSurface::new(RgbaImage::from_pixel(
            viewport.width,
            viewport.height,
            Rgba([255, 255, 255, 255]),
        )))
    }

    async fn page_text(&self, page_index: usize) -> Result<Vec<String>, EngineError> {
        let page = self.page(page_index)?;
        let now = self.counters.text_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.text_peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.counters.text_in_flight);

        page.text.apply("text").await?;
        Ok(page.tokens.clone())
    }
}

/// Route library logs to the test harness; `RUST_LOG=pdf_ingest=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An ingestor backed by `script`, plus the engine's counters.
pub fn ingestor(script: Script, config: IngestConfig) -> (Ingestor, Arc<Counters>) {
    init_tracing();
    let counters = Arc::new(Counters::default());
    let factory = ScriptedFactory {
        script: Arc::new(script),
        counters: Arc::clone(&counters),
    };
    let loader = Arc::new(EngineLoader::new(Arc::new(factory)));
    (Ingestor::with_loader(config, loader), counters)
}

/// Config with short deadlines so timeout tests finish quickly.
pub fn fast_config() -> IngestConfig {
    IngestConfig::builder()
        .load_timeout_ms(2_000)
        .render_timeout_ms(2_000)
        .extract_timeout_ms(2_000)
        .chunk_pause_ms(1)
        .min_text_chars(5)
        .build()
        .unwrap()
}

pub fn pdf(name: &str) -> SourceDocument {
    SourceDocument::pdf(b"%PDF-1.7\n% scripted\n".to_vec(), name)
}
