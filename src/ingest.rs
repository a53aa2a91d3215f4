//! The ingestion pipeline: one uploaded receipt, start to finish.
//!
//! Stages run strictly sequentially within a request; there is no
//! intra-request parallelism to coordinate. The state machine is:
//!
//! ```text
//! validate ──▶ save ──▶ register ──▶ ocr ──▶ extract ──▶ persist ──▶ report
//!    │fatal      │fatal     │fatal     │non-fatal │non-fatal  │non-fatal
//! ```
//!
//! The first three steps are fatal on failure: without a stored file and a
//! receipt row there is nothing to track. From the OCR stage on, failures
//! only degrade their own stage's report — a saved file and a registered
//! receipt are never rolled back by a downstream failure, and no external
//! call is ever retried.

use crate::capability::Capabilities;
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::model::{NewReceipt, ReceiptStatus};
use crate::pipeline::{extract, ocr, persist, validate};
use crate::report::IngestOutput;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

/// One uploaded file, as received from the transport layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Ingest a single uploaded receipt.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(IngestOutput)` once the file is stored and the receipt registered,
/// even if OCR or extraction failed — check the per-stage reports.
///
/// # Errors
/// Returns `Err(IngestError)` only for fatal errors:
/// - disallowed content type or empty upload (no side effects yet)
/// - blob-store save failure (no side effects yet)
/// - receipt registration failure (stored file becomes an orphan)
pub async fn ingest(
    upload: UploadedFile,
    caps: &Capabilities,
    config: &IngestConfig,
) -> Result<IngestOutput, IngestError> {
    // ── Stage 1: Validate ────────────────────────────────────────────────
    validate::validate_content_type(&upload.content_type)?;
    if upload.bytes.is_empty() {
        return Err(IngestError::EmptyUpload);
    }

    let uuid = Uuid::new_v4();
    let uploaded_at = Utc::now();
    let stored_name = validate::stored_file_name(&uuid, &upload.original_name, uploaded_at);
    info!(%uuid, original = %upload.original_name, "ingesting receipt");

    // ── Stage 2: Save the original bytes ─────────────────────────────────
    let file_path = caps
        .blobs
        .save(&stored_name, &upload.bytes)
        .await
        .map_err(|e| IngestError::StorageFailed {
            name: stored_name.clone(),
            reason: format!("{e:#}"),
        })?;

    // ── Stage 3: Register the receipt ────────────────────────────────────
    // Inserted before OCR is attempted so every stored file has a trackable
    // row even if everything downstream fails.
    let receipt_id = caps
        .store
        .insert_receipt(NewReceipt {
            uuid,
            stored_name: stored_name.clone(),
            original_name: upload.original_name.clone(),
            content_type: upload.content_type.clone(),
            status: ReceiptStatus::NeedsReview,
            uploaded_at,
        })
        .await
        .map_err(|e| IngestError::RegistrationFailed {
            name: stored_name.clone(),
            reason: format!("{e:#}"),
        })?;
    debug!(receipt_id, %uuid, "receipt registered");

    // ── Stage 4: OCR ─────────────────────────────────────────────────────
    let ocr_report = ocr::run(&caps.ocr, &upload.content_type, &upload.bytes, config).await;

    // ── Stage 5: Extraction ──────────────────────────────────────────────
    let extraction = extract::run(&caps.extractor, &ocr_report, config).await;

    // ── Stage 6: Persist the transaction (best-effort) ───────────────────
    let status = match &extraction.parsed {
        Some(parsed) => persist::run(&caps.store, receipt_id, parsed).await,
        None => ReceiptStatus::NeedsReview,
    };

    info!(
        receipt_id,
        ocr = %ocr_report.status,
        extraction = %extraction.status,
        status = %status,
        "ingest complete"
    );

    // ── Stage 7: Assemble the report ─────────────────────────────────────
    Ok(IngestOutput {
        success: true,
        receipt_id,
        uuid,
        original_name: upload.original_name,
        stored_name,
        file_size: upload.bytes.len() as u64,
        content_type: upload.content_type,
        upload_time: uploaded_at,
        file_path: file_path.to_string_lossy().into_owned(),
        status,
        ocr: ocr_report,
        extraction,
    })
}
