//! Server binary for receiptflow.
//!
//! A thin shim over the library crate: maps CLI flags and environment
//! variables to an [`IngestConfig`] plus concrete adapters, then serves the
//! HTTP surface.

use anyhow::{Context, Result};
use clap::Parser;
use receiptflow::adapters::{FsBlobStore, GeminiExtractor, SqliteStore};
#[cfg(feature = "ocr-tesseract")]
use receiptflow::adapters::TesseractOcr;
#[cfg(not(feature = "ocr-tesseract"))]
use receiptflow::adapters::NoOcr;
use receiptflow::capability::{Capabilities, OcrEngine};
use receiptflow::server::{serve, AppState};
use receiptflow::IngestConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   Gemini API key (required)
  GEMINI_MODEL     Gemini model ID (default: gemini-1.5-flash)
  GEMINI_PROMPT    Override the extraction prompt template; may contain
                   the {receipt_text} placeholder

SETUP:
  1. Set API key:   export GEMINI_API_KEY=...
  2. Run:           receiptd --db receipts.db --uploads-dir uploads

  OCR needs the native Tesseract backend:
      cargo install receiptflow --features ocr-tesseract
  Without it, image uploads are stored and registered but their OCR stage
  reports `failed`.
"#;

/// Receipt ingestion server: upload, OCR, LLM field extraction, SQLite.
#[derive(Parser, Debug)]
#[command(
    name = "receiptd",
    version,
    about = "Receipt ingestion server: upload, OCR, LLM field extraction, SQLite",
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "RECEIPTD_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// SQLite database path.
    #[arg(long, env = "RECEIPTD_DB", default_value = "receipts.db")]
    db: PathBuf,

    /// Directory for stored upload files.
    #[arg(long, env = "RECEIPTD_UPLOADS_DIR", default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Extraction prompt template override.
    #[arg(long, env = "GEMINI_PROMPT", hide_env_values = true)]
    prompt: Option<String>,

    /// OCR deadline per request, in seconds.
    #[arg(long, env = "RECEIPTD_OCR_TIMEOUT", default_value_t = 30)]
    ocr_timeout: u64,

    /// Extraction deadline per request, in seconds.
    #[arg(long, env = "RECEIPTD_EXTRACT_TIMEOUT", default_value_t = 60)]
    extract_timeout: u64,

    /// Tesseract language code (needs the ocr-tesseract feature).
    #[arg(long, env = "RECEIPTD_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RECEIPTD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RECEIPTD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();
    debug!(ocr_lang = %cli.ocr_lang, db = %cli.db.display(), "starting receiptd");

    // ── Config ───────────────────────────────────────────────────────────
    let mut builder = IngestConfig::builder()
        .ocr_timeout_secs(cli.ocr_timeout)
        .extract_timeout_secs(cli.extract_timeout);
    if let Some(prompt) = cli.prompt {
        builder = builder.prompt_template(prompt);
    }
    let config = builder.build().context("invalid configuration")?;

    // ── Adapters ─────────────────────────────────────────────────────────
    let store = Arc::new(SqliteStore::open(&cli.db)?);
    let blobs = Arc::new(FsBlobStore::new(&cli.uploads_dir)?);
    let extractor = Arc::new(
        GeminiExtractor::from_env().context("extraction backend not configured")?,
    );

    #[cfg(feature = "ocr-tesseract")]
    let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::new(cli.ocr_lang.clone()));
    #[cfg(not(feature = "ocr-tesseract"))]
    let ocr: Arc<dyn OcrEngine> = {
        tracing::warn!("built without an OCR backend; image OCR stages will report failed");
        Arc::new(NoOcr)
    };

    let caps = Capabilities {
        blobs,
        ocr,
        extractor,
        store,
    };

    // ── Serve ────────────────────────────────────────────────────────────
    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", cli.bind))?;
    serve(addr, AppState { caps, config }).await
}
