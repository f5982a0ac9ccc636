//! CLI binary for pdf-ingest.
//!
//! A thin shim over the library crate that maps CLI flags to `IngestConfig`,
//! runs one document through the pipeline and writes the preview and text.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_ingest::{
    ImageFormat, IngestConfig, IngestProgressCallback, Ingestor, LocalDirStore, ProgressCallback,
    SourceDocument, Stage,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One spinner line showing the current stage, with a log line per finished
/// or failed stage printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage.label()));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<22} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        self.bar
            .println(format!("  {} {:<22} {}", red("✗"), stage.label(), red(error)));
    }

    fn on_chunk(&self, first_page: usize, last_page: usize, total_pages: usize) {
        self.bar.set_message(format!(
            "Extracting text (pages {first_page}-{last_page} of {total_pages})…"
        ));
    }

    fn on_page_error(&self, page_num: usize, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("    {} page {}: {}", dim("·"), page_num, dim(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the text, write the preview next to it
  pdf-ingest resume.pdf --preview-out resume.jpg

  # Lossless 2x preview, text to a file
  pdf-ingest resume.pdf --format png --scale 2 --preview-out p.png --text-out resume.txt

  # Full upload flow into a local object store
  pdf-ingest resume.pdf --store-dir ./storage

  # JSON outcome (preview metadata, text, timings)
  pdf-ingest --json resume.pdf > outcome.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH    Path to the pdfium shared library
  PDFIUM_CACHE_DIR   Directory searched for a cached pdfium library
  RUST_LOG           Log filter, e.g. pdf_ingest=debug
"#;

/// Render a PDF preview and extract its text.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-ingest",
    version,
    about = "Render a PDF preview and extract its text",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to ingest.
    input: PathBuf,

    /// JSON config file; flags override its values.
    #[arg(long, env = "PDF_INGEST_CONFIG")]
    config: Option<PathBuf>,

    /// Local pdfium shared library.
    #[arg(long, env = "PDF_INGEST_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Preview render scale (0.1–8.0).
    #[arg(long, env = "PDF_INGEST_SCALE")]
    scale: Option<f32>,

    /// Preview encoding.
    #[arg(long, env = "PDF_INGEST_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Encoder quality (0.0–1.0), JPEG only.
    #[arg(long, env = "PDF_INGEST_QUALITY")]
    quality: Option<f32>,

    /// Pages extracted concurrently per group.
    #[arg(long, env = "PDF_INGEST_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Document parse deadline in milliseconds.
    #[arg(long, env = "PDF_INGEST_LOAD_TIMEOUT_MS")]
    load_timeout_ms: Option<u64>,

    /// Render + encode deadline in milliseconds.
    #[arg(long, env = "PDF_INGEST_RENDER_TIMEOUT_MS")]
    render_timeout_ms: Option<u64>,

    /// Whole-document text deadline in milliseconds.
    #[arg(long, env = "PDF_INGEST_EXTRACT_TIMEOUT_MS")]
    extract_timeout_ms: Option<u64>,

    /// Minimum characters of text required with --store-dir.
    #[arg(long, env = "PDF_INGEST_MIN_TEXT_CHARS")]
    min_text_chars: Option<usize>,

    /// Rasterise, then extract, instead of running both at once.
    #[arg(long, env = "PDF_INGEST_SEQUENTIAL")]
    sequential: bool,

    /// Write the preview image here.
    #[arg(long)]
    preview_out: Option<PathBuf>,

    /// Write the extracted text here instead of stdout.
    #[arg(long)]
    text_out: Option<PathBuf>,

    /// Store the PDF and preview under this directory (buckets `resumes/`, `images/`).
    #[arg(long, env = "PDF_INGEST_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Print a JSON outcome instead of plain text.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "PDF_INGEST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_INGEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;
    let doc = SourceDocument::from_path(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let spinner = show_progress.then(CliProgressCallback::new);
    let mut ingestor = Ingestor::new(config);
    if let Some(cb) = &spinner {
        ingestor = ingestor.with_progress(Arc::clone(cb) as ProgressCallback);
    }

    // ── Store mode ───────────────────────────────────────────────────────
    if let Some(ref dir) = cli.store_dir {
        let store = LocalDirStore::new(dir);
        let stored = ingestor.process_and_store(&doc, &store).await;
        if let Some(cb) = &spinner {
            cb.finish();
        }
        let stored = stored.context("Ingestion failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&stored).context("Failed to serialise result")?
            );
        } else {
            write_text(&stored.text, cli.text_out.as_ref())?;
            if !cli.quiet {
                eprintln!(
                    "{} stored {}",
                    green("✔"),
                    bold(&store.resolve(&stored.resume_path).display().to_string())
                );
                match &stored.image_path {
                    Some(p) => eprintln!(
                        "{} stored {}",
                        green("✔"),
                        bold(&store.resolve(p).display().to_string())
                    ),
                    None => eprintln!("{} no preview stored", dim("·")),
                }
            }
        }
        return Ok(());
    }

    // ── Process mode ─────────────────────────────────────────────────────
    let outcome = ingestor.process(&doc).await;
    if let Some(cb) = &spinner {
        cb.finish();
    }

    if let (Some(path), Some(file)) = (cli.preview_out.as_ref(), outcome.image.file()) {
        tokio::fs::write(path, &file.bytes)
            .await
            .with_context(|| format!("Failed to write preview to {}", path.display()))?;
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else if let Ok(text) = &outcome.text {
        write_text(text, cli.text_out.as_ref())?;
    }

    if !cli.quiet && !cli.json {
        if let Some(err) = outcome.image.error() {
            eprintln!("{} preview: {}", red("✗"), err);
        }
        eprintln!(
            "{}",
            dim(&format!(
                "{} pages  raster {}ms  extract {}ms  total {}ms",
                outcome.stats.page_count,
                outcome.stats.raster_ms,
                outcome.stats.extract_ms,
                outcome.stats.total_ms
            ))
        );
    }

    outcome.release();
    if let Err(e) = outcome.text {
        anyhow::bail!("Text extraction failed: {e}");
    }
    Ok(())
}

/// Map CLI args (and an optional JSON file) to `IngestConfig`.
async fn build_config(cli: &Cli) -> Result<IngestConfig> {
    let base = match cli.config {
        Some(ref path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            IngestConfig::from_json_str(&json).context("Invalid config file")?
        }
        None => IngestConfig::default(),
    };

    let mut builder = base.into_builder();
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.engine_library_path(lib);
    }
    if let Some(scale) = cli.scale {
        builder = builder.default_scale(scale);
    }
    if let Some(format) = cli.format {
        builder = builder.image_format(format.into());
    }
    if let Some(q) = cli.quality {
        builder = builder.image_quality(q);
    }
    if let Some(n) = cli.chunk_size {
        builder = builder.chunk_size(n);
    }
    if let Some(ms) = cli.load_timeout_ms {
        builder = builder.load_timeout_ms(ms);
    }
    if let Some(ms) = cli.render_timeout_ms {
        builder = builder.render_timeout_ms(ms);
    }
    if let Some(ms) = cli.extract_timeout_ms {
        builder = builder.extract_timeout_ms(ms);
    }
    if let Some(n) = cli.min_text_chars {
        builder = builder.min_text_chars(n);
    }
    if cli.sequential {
        builder = builder.parallel(false);
    }

    builder.build().context("Invalid configuration")
}

fn write_text(text: &str, path: Option<&PathBuf>) -> Result<()> {
    match path {
        Some(p) => std::fs::write(p, text)
            .with_context(|| format!("Failed to write text to {}", p.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(())
        }
    }
}
