//! OCR stage: text off the stored image, or a recorded reason why not.
//!
//! Three outcomes, per the stage contract:
//!
//! * `skipped` — the upload is a PDF. PDF text extraction is a distinct
//!   capability this pipeline does not have; attempting OCR on PDF bytes
//!   would only produce engine noise.
//! * `failed`  — the engine errored or the call outlived its deadline. The
//!   error string is captured and the pipeline continues as "no text
//!   available".
//! * `success` — text extracted. An empty string is still a success; the
//!   extraction gate treats it as no text.
//!
//! One attempt per request, no retries.

use crate::capability::OcrEngine;
use crate::config::IngestConfig;
use crate::pipeline::validate;
use crate::report::StageReport;
use std::sync::Arc;
use tracing::warn;

/// Skip reason recorded for PDF uploads.
pub const SKIP_REASON_PDF: &str = "PDF files require separate processing";

/// Run the OCR stage for one stored upload.
pub async fn run(
    engine: &Arc<dyn OcrEngine>,
    content_type: &str,
    bytes: &[u8],
    config: &IngestConfig,
) -> StageReport {
    if validate::is_pdf(content_type) {
        return StageReport::skipped(SKIP_REASON_PDF);
    }

    match tokio::time::timeout(config.ocr_timeout(), engine.extract_text(bytes)).await {
        Err(_) => {
            let reason = format!("OCR timed out after {}s", config.ocr_timeout_secs);
            warn!("{reason}");
            StageReport::failed(reason)
        }
        Ok(Err(e)) => {
            warn!("OCR failed: {e:#}");
            StageReport::failed(format!("OCR failed: {e:#}"))
        }
        Ok(Ok(text)) => StageReport::success(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::StageStatus;
    use anyhow::bail;
    use async_trait::async_trait;

    struct FixedOcr(Result<String, String>);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn extract_text(&self, _bytes: &[u8]) -> anyhow::Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(msg) => bail!("{msg}"),
            }
        }
    }

    struct HangingOcr;

    #[async_trait]
    impl OcrEngine for HangingOcr {
        async fn extract_text(&self, _bytes: &[u8]) -> anyhow::Result<String> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn pdf_is_skipped_without_engine_call() {
        let engine: Arc<dyn OcrEngine> = Arc::new(FixedOcr(Err("must not run".into())));
        let report = run(
            &engine,
            "application/pdf",
            b"%PDF-1.4",
            &IngestConfig::default(),
        )
        .await;
        assert_eq!(report.status, StageStatus::Skipped);
        assert_eq!(report.error, SKIP_REASON_PDF);
    }

    #[tokio::test]
    async fn engine_error_is_failed_not_skipped() {
        let engine: Arc<dyn OcrEngine> = Arc::new(FixedOcr(Err("bad image data".into())));
        let report = run(&engine, "image/jpeg", b"not-a-jpeg", &IngestConfig::default()).await;
        assert_eq!(report.status, StageStatus::Failed);
        assert!(report.error.contains("bad image data"));
    }

    #[tokio::test]
    async fn success_carries_text() {
        let engine: Arc<dyn OcrEngine> = Arc::new(FixedOcr(Ok("WALMART\n$45.67".into())));
        let report = run(&engine, "image/jpeg", b"jpeg", &IngestConfig::default()).await;
        assert_eq!(report.status, StageStatus::Success);
        assert_eq!(report.text, "WALMART\n$45.67");
        assert!(report.error.is_empty());
    }

    #[tokio::test]
    async fn deadline_exceeded_is_failed_with_timeout_reason() {
        let engine: Arc<dyn OcrEngine> = Arc::new(HangingOcr);
        let config = IngestConfig::builder().ocr_timeout_secs(1).build().unwrap();
        let report = run(&engine, "image/png", b"png", &config).await;
        assert_eq!(report.status, StageStatus::Failed);
        assert!(report.error.contains("timed out after 1s"));
    }
}
