//! Error types for the receiptflow library.
//!
//! Two distinct failure modes get two distinct representations:
//!
//! * [`IngestError`] — **Fatal**: the request cannot produce a tracked
//!   receipt at all (disallowed content type, blob-store write failure,
//!   receipt-row insert failure). Returned as `Err(IngestError)` from
//!   [`crate::ingest::ingest`].
//!
//! * Stage outcomes — **Non-fatal**: OCR or extraction failed, or the
//!   extraction JSON did not parse. These never abort the request; they are
//!   recorded in the [`crate::report::StageReport`]s of the returned output
//!   so callers can inspect partial success per stage.
//!
//! The separation mirrors the lifecycle guarantee: once a file is stored and
//! its receipt row exists, the request succeeds and downstream failures only
//! degrade their own stage.

use thiserror::Error;

/// All fatal errors returned by the ingestion pipeline.
///
/// Stage-level failures are carried inside [`crate::report::StageReport`]
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Uploaded content type is not on the allow-list.
    #[error("unsupported content type '{content_type}'. Allowed: images (jpeg, png, gif, webp) and PDF")]
    UnsupportedMediaType { content_type: String },

    /// The upload carried no bytes.
    #[error("uploaded file is empty")]
    EmptyUpload,

    /// The blob store could not persist the original bytes.
    ///
    /// Nothing has been recorded yet at this point; the request leaves no
    /// observable state behind.
    #[error("failed to store upload as '{name}': {reason}")]
    StorageFailed { name: String, reason: String },

    /// The receipt row could not be inserted after a successful save.
    ///
    /// The stored file is orphaned; cleanup is out-of-band.
    #[error("failed to register receipt for '{name}': {reason}")]
    RegistrationFailed { name: String, reason: String },

    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestError {
    /// True for errors caused by the request itself rather than the service.
    ///
    /// The HTTP surface maps these to 400 and everything else to 500.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::UnsupportedMediaType { .. } | IngestError::EmptyUpload
        )
    }
}
