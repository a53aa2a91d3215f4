//! Upload validation and stored-name generation.
//!
//! Validation runs before any side effect: a rejected upload leaves no file
//! and no receipt row. The stored name combines the receipt UUID with a
//! second-resolution timestamp, so concurrent uploads of identically named
//! files never collide and the name alone tells an operator when the file
//! arrived.

use crate::error::IngestError;
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

/// Content types the pipeline accepts.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
];

/// Reject anything not on the allow-list, including an empty content type.
pub fn validate_content_type(content_type: &str) -> Result<(), IngestError> {
    if ALLOWED_CONTENT_TYPES.contains(&content_type) {
        Ok(())
    } else {
        Err(IngestError::UnsupportedMediaType {
            content_type: content_type.to_string(),
        })
    }
}

/// PDFs are stored and registered but never sent to OCR.
pub fn is_pdf(content_type: &str) -> bool {
    content_type == "application/pdf"
}

/// Collision-resistant stored file name: `{uuid}_{YYYYMMDD_HHMMSS}{ext}`.
///
/// The extension is carried over from the original file name when present
/// (dot included), matching what the blob store will serve back.
pub fn stored_file_name(uuid: &Uuid, original_name: &str, uploaded_at: DateTime<Utc>) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{uuid}_{}{ext}", uploaded_at.format("%Y%m%d_%H%M%S"))
}
