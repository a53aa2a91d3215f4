//! Bundled capability adapters.
//!
//! Each adapter is a thin concrete implementation of one
//! [`crate::capability`] trait:
//!
//! * [`FsBlobStore`]    — uploads directory on the local filesystem
//! * [`SqliteStore`]    — rusqlite-backed receipts/transactions store
//! * [`GeminiExtractor`] — Gemini `generateContent` REST endpoint
//! * [`TesseractOcr`]   — native Tesseract bindings (feature `ocr-tesseract`)
//! * [`NoOcr`]          — stand-in engine for builds without a backend
//!
//! None of them carry pipeline logic; swapping any of them for another
//! implementation of the same trait must not change stage semantics.

mod fs_blob;
mod gemini;
mod sqlite;
#[cfg(feature = "ocr-tesseract")]
mod tesseract;

pub use fs_blob::FsBlobStore;
pub use gemini::GeminiExtractor;
pub use sqlite::SqliteStore;
#[cfg(feature = "ocr-tesseract")]
pub use tesseract::TesseractOcr;

use crate::capability::OcrEngine;
use anyhow::{bail, Result};
use async_trait::async_trait;

/// OCR engine for builds compiled without a native backend.
///
/// Every call errors, so image uploads get an OCR stage of `failed` with a
/// build hint while the rest of the pipeline (storage, registration,
/// reporting) keeps working.
pub struct NoOcr;

#[async_trait]
impl OcrEngine for NoOcr {
    async fn extract_text(&self, _bytes: &[u8]) -> Result<String> {
        bail!("no OCR engine compiled in; rebuild with --features ocr-tesseract")
    }
}
