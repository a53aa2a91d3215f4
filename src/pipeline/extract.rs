//! Extraction stage: OCR text in, structured receipt fields out.
//!
//! The stage gates on usable OCR text, drives the extraction capability
//! under a deadline, then post-processes the answer. Capability-level
//! failure fails the stage; a JSON parse failure does **not** — the raw
//! analysis text is still worth returning to the caller, so the stage stays
//! `success` with the parse error attached and no structured fields.
//!
//! ## Why fence stripping?
//!
//! The extraction backend is prompted to return bare JSON but is known to
//! sometimes wrap its answer in a Markdown code fence anyway. One cheap,
//! deterministic regex pass removes a symmetric outer fence (optionally
//! tagged `json`) before parsing, so fenced and unfenced answers parse
//! identically.

use crate::capability::Extractor;
use crate::config::IngestConfig;
use crate::model::ParsedReceipt;
use crate::prompts;
use crate::report::{ExtractionReport, StageReport};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

/// Skip reason when the OCR stage produced nothing to analyse.
pub const SKIP_REASON_NO_TEXT: &str = "no OCR text available";

/// Run the extraction stage against the OCR stage's report.
pub async fn run(
    extractor: &Arc<dyn Extractor>,
    ocr: &StageReport,
    config: &IngestConfig,
) -> ExtractionReport {
    if !ocr.has_text() {
        return ExtractionReport::skipped(SKIP_REASON_NO_TEXT);
    }

    let prompt = prompts::render_prompt(config.prompt_template.as_deref(), &ocr.text);

    let raw = match tokio::time::timeout(config.extract_timeout(), extractor.analyze(&prompt)).await
    {
        Err(_) => {
            let reason = format!("extraction timed out after {}s", config.extract_timeout_secs);
            warn!("{reason}");
            return ExtractionReport::failed(reason);
        }
        Ok(Err(e)) => {
            warn!("extraction failed: {e:#}");
            return ExtractionReport::failed(format!("extraction failed: {e:#}"));
        }
        Ok(Ok(raw)) => raw,
    };

    let cleaned = strip_code_fences(&raw);
    match serde_json::from_str::<ParsedReceipt>(&cleaned) {
        Ok(parsed) => ExtractionReport::parsed(raw, parsed),
        Err(e) => {
            warn!("extraction response did not parse as JSON: {e}");
            ExtractionReport::unparsed(raw, format!("failed to parse extraction JSON: {e}"))
        }
    }
}

// Matches a whole answer wrapped in one outer fence pair. The inner capture
// is lazy so a fence appearing inside the JSON (in a string value) does not
// end the match early.
static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A```(?:json)?\s*(.*?)\s*```\s*\z").unwrap());

/// Strip a symmetric outer Markdown code fence, if present.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::StageStatus;
    use anyhow::bail;
    use async_trait::async_trait;

    const GOOD_JSON: &str = r#"{"date":"2024-01-15","merchant_raw":"WALMART","merchant_clean":"Walmart","category":"groceries","amount":45.67,"currency":"USD","confidence":0.9}"#;

    struct FixedExtractor(Result<String, String>);

    #[async_trait]
    impl Extractor for FixedExtractor {
        async fn analyze(&self, _prompt: &str) -> anyhow::Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(msg) => bail!("{msg}"),
            }
        }
    }

    fn ok(text: &str) -> Arc<dyn Extractor> {
        Arc::new(FixedExtractor(Ok(text.to_string())))
    }

    #[tokio::test]
    async fn skipped_without_ocr_text() {
        let report = run(
            &ok(GOOD_JSON),
            &StageReport::success("   "),
            &IngestConfig::default(),
        )
        .await;
        assert_eq!(report.status, StageStatus::Skipped);
        assert_eq!(report.error, SKIP_REASON_NO_TEXT);
    }

    #[tokio::test]
    async fn skipped_when_ocr_failed() {
        let report = run(
            &ok(GOOD_JSON),
            &StageReport::failed("engine exploded"),
            &IngestConfig::default(),
        )
        .await;
        assert_eq!(report.status, StageStatus::Skipped);
    }

    #[tokio::test]
    async fn capability_error_fails_stage() {
        let extractor: Arc<dyn Extractor> =
            Arc::new(FixedExtractor(Err("HTTP 503 from backend".into())));
        let report = run(
            &extractor,
            &StageReport::success("WALMART 45.67"),
            &IngestConfig::default(),
        )
        .await;
        assert_eq!(report.status, StageStatus::Failed);
        assert!(report.error.contains("HTTP 503"));
        assert!(report.parsed.is_none());
    }

    #[tokio::test]
    async fn fenced_and_unfenced_parse_identically() {
        let ocr = StageReport::success("WALMART 45.67");
        let config = IngestConfig::default();

        let plain = run(&ok(GOOD_JSON), &ocr, &config).await;
        let fenced = run(&ok(&format!("```json\n{GOOD_JSON}\n```")), &ocr, &config).await;

        assert_eq!(plain.status, StageStatus::Success);
        assert_eq!(fenced.status, StageStatus::Success);
        assert_eq!(plain.parsed, fenced.parsed);
        assert_eq!(fenced.parsed.as_ref().unwrap().amount, Some(45.67));
    }

    #[tokio::test]
    async fn malformed_json_is_success_with_parse_error() {
        let report = run(
            &ok("The receipt is from Walmart for $45.67."),
            &StageReport::success("WALMART 45.67"),
            &IngestConfig::default(),
        )
        .await;
        assert_eq!(report.status, StageStatus::Success);
        assert_eq!(report.analysis, "The receipt is from Walmart for $45.67.");
        assert!(report.error.contains("parse"));
        assert!(report.parsed.is_none());
    }

    #[test]
    fn strip_untagged_fences() {
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strip_json_tagged_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```\n"), "{\"a\":1}");
    }

    #[test]
    fn unfenced_input_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn inner_fence_in_string_survives() {
        let input = "```json\n{\"note\":\"use ``` for code\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"note\":\"use ``` for code\"}");
    }
}
