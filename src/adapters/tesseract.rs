//! Native Tesseract OCR adapter (feature `ocr-tesseract`).
//!
//! The bindings are blocking and CPU-bound, so the engine call runs under
//! `spawn_blocking` to keep it off the async executor. A fresh engine is
//! initialised per call; Tesseract handles are not `Send` and per-call
//! initialisation is cheap next to recognition itself.

use crate::capability::OcrEngine;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::debug;

pub struct TesseractOcr {
    lang: String,
}

impl TesseractOcr {
    /// `lang` is a Tesseract language code such as `"eng"`.
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        let lang = self.lang.clone();
        let bytes = bytes.to_vec();

        let text = tokio::task::spawn_blocking(move || -> Result<String> {
            let mut engine = tesseract::Tesseract::new(None, Some(&lang))
                .map_err(|e| anyhow!("failed to initialise Tesseract: {e}"))?
                .set_image_from_mem(&bytes)
                .map_err(|e| anyhow!("failed to load image into Tesseract: {e}"))?;
            engine
                .get_text()
                .map_err(|e| anyhow!("Tesseract text extraction failed: {e}"))
        })
        .await
        .context("OCR task panicked")??;

        debug!(chars = text.len(), "tesseract extracted text");
        Ok(text)
    }
}
