//! Per-stage outcome reporting: the response-shape contract of the pipeline.
//!
//! The overall request succeeds once the upload is stored and registered;
//! everything downstream communicates partial failure through these reports
//! instead of an error code. Each stage lands in exactly one of three
//! states:
//!
//! * `success` — the stage ran and produced output;
//! * `failed`  — the stage ran and errored (the pipeline continues);
//! * `skipped` — the stage was never attempted, by policy, with the reason
//!   in the `error` field. A skip is not a failure.
//!
//! The `error` field serialises as an empty string when absent, which is the
//! wire contract callers already parse.

use crate::model::{ParsedReceipt, ReceiptStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Outcome of a single pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageStatus::Success => "success",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Report for the OCR stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub status: StageStatus,
    /// Extracted text; empty unless the stage succeeded.
    pub text: String,
    /// Failure detail or skip reason; empty when the stage succeeded.
    pub error: String,
}

impl StageReport {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Success,
            text: text.into(),
            error: String::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Failed,
            text: String::new(),
            error: error.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skipped,
            text: String::new(),
            error: reason.into(),
        }
    }

    /// True when the stage produced usable text for the extraction stage.
    ///
    /// An empty-string success is equivalent to "no text available".
    pub fn has_text(&self) -> bool {
        self.status == StageStatus::Success && !self.text.trim().is_empty()
    }
}

/// Report for the extraction stage.
///
/// `status` reflects the capability call, not the JSON parse: a response that
/// arrived but failed to parse is still a `success` with `error` populated
/// and `parsed` empty. Callers get the raw analysis text either way.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub status: StageStatus,
    /// Raw capability response text; empty unless the call succeeded.
    pub analysis: String,
    /// Capability failure, parse failure, or skip reason; empty otherwise.
    pub error: String,
    /// Structured fields, present only when the JSON parsed.
    pub parsed: Option<ParsedReceipt>,
}

impl ExtractionReport {
    pub fn parsed(analysis: impl Into<String>, parsed: ParsedReceipt) -> Self {
        Self {
            status: StageStatus::Success,
            analysis: analysis.into(),
            error: String::new(),
            parsed: Some(parsed),
        }
    }

    pub fn unparsed(analysis: impl Into<String>, parse_error: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Success,
            analysis: analysis.into(),
            error: parse_error.into(),
            parsed: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Failed,
            analysis: String::new(),
            error: error.into(),
            parsed: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skipped,
            analysis: String::new(),
            error: reason.into(),
            parsed: None,
        }
    }
}

/// Everything the caller learns about one ingested receipt.
///
/// Returned for every request that survived storage and registration,
/// regardless of OCR/extraction outcome. `status` is the lifecycle state as
/// observed when the pipeline finished — not re-queried from the store.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutput {
    pub success: bool,
    /// Store-assigned receipt row id.
    pub receipt_id: i64,
    /// Generated receipt identifier.
    pub uuid: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub file_size: u64,
    pub content_type: String,
    pub upload_time: DateTime<Utc>,
    pub file_path: String,
    pub status: ReceiptStatus,
    pub ocr: StageReport,
    pub extraction: ExtractionReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&StageStatus::Skipped).unwrap(),
            "\"skipped\""
        );
    }

    #[test]
    fn skip_reason_lives_in_error_field() {
        let report = StageReport::skipped("PDF files require separate processing");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["error"], "PDF files require separate processing");
        assert_eq!(json["text"], "");
    }

    #[test]
    fn empty_success_has_no_text() {
        assert!(StageReport::success("TOTAL 12.00").has_text());
        assert!(!StageReport::success("").has_text());
        assert!(!StageReport::success("   \n").has_text());
        assert!(!StageReport::failed("engine error").has_text());
    }

    #[test]
    fn unparsed_extraction_is_still_success() {
        let report = ExtractionReport::unparsed("not json", "expected value at line 1");
        assert_eq!(report.status, StageStatus::Success);
        assert!(report.parsed.is_none());
        assert!(!report.error.is_empty());
        assert_eq!(report.analysis, "not json");
    }
}
