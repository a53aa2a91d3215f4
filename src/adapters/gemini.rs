//! Gemini extraction adapter over the `generateContent` REST endpoint.
//!
//! Text-only prompting against
//! `https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent`.
//! Generation parameters are pinned low-temperature: field extraction wants
//! the model deterministic and faithful to the OCR text, not creative.

use crate::capability::Extractor;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

// Generation parameters for structured extraction.
const TEMPERATURE: f64 = 0.2;
const TOP_P: f64 = 0.8;
const TOP_K: u32 = 40;
const MAX_OUTPUT_TOKENS: u32 = 2048;

pub struct GeminiExtractor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiExtractor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build from `GEMINI_API_KEY` (required) and `GEMINI_MODEL` (optional).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY environment variable not set")?;
        if api_key.is_empty() {
            bail!("GEMINI_API_KEY environment variable is empty");
        }
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key, model))
    }

    /// Point the adapter at a different host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn analyze(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        debug!(model = %self.model, prompt_len = prompt.len(), "calling Gemini");
        let response = self
            .client
            .post(&url)
            .json(&request_body(prompt))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini API error: HTTP {status}: {body}");
        }

        let json: Value = response
            .json()
            .await
            .context("Gemini response was not valid JSON")?;
        response_text(&json)
    }
}

fn request_body(prompt: &str) -> Value {
    serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "topP": TOP_P,
            "topK": TOP_K,
            "maxOutputTokens": MAX_OUTPUT_TOKENS
        }
    })
}

/// Pull the answer text out of a `generateContent` response.
///
/// Concatenates every part of the first candidate. No candidates, or
/// candidates with no text, count as a capability failure.
fn response_text(json: &Value) -> Result<String> {
    let candidates = json["candidates"]
        .as_array()
        .filter(|c| !c.is_empty())
        .context("no response candidates returned")?;

    let text: String = candidates[0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        bail!("response candidate contained no text");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = request_body("extract this");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "extract this");
        assert_eq!(body["generationConfig"]["temperature"], 0.2);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn response_text_concatenates_parts() {
        let json: Value = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"amount\":"},{"text":"45.67}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(&json).unwrap(), "{\"amount\":45.67}");
    }

    #[test]
    fn empty_candidates_is_an_error() {
        let json: Value = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        let err = response_text(&json).unwrap_err();
        assert!(err.to_string().contains("no response candidates"));
    }

    #[test]
    fn textless_candidate_is_an_error() {
        let json: Value =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[]}}]}"#).unwrap();
        assert!(response_text(&json).is_err());
    }
}
