//! Configuration for the ingestion pipeline.
//!
//! All pipeline behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`]. Capability instances (blob store, OCR engine,
//! extractor, relational store) are injected separately through
//! [`crate::capability::Capabilities`]; this struct holds only the knobs.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline knobs.
///
/// # Example
/// ```rust
/// use receiptflow::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .ocr_timeout_secs(20)
///     .extract_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Extraction prompt template. `None` uses the built-in default.
    ///
    /// The template may contain the `{receipt_text}` placeholder; see
    /// [`crate::prompts::render_prompt`] for how text is substituted.
    pub prompt_template: Option<String>,

    /// Deadline for one OCR capability call, in seconds. Default: 30.
    ///
    /// The engine call blocks the owning request until it returns; a deadline
    /// turns a hung engine into a `failed` OCR stage instead of a hung
    /// request.
    pub ocr_timeout_secs: u64,

    /// Deadline for one extraction capability call, in seconds. Default: 60.
    pub extract_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            prompt_template: None,
            ocr_timeout_secs: 30,
            extract_timeout_secs: 60,
        }
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    pub(crate) fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub(crate) fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn extract_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extract_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        if c.ocr_timeout_secs == 0 {
            return Err(IngestError::InvalidConfig(
                "OCR timeout must be ≥ 1 second".into(),
            ));
        }
        if c.extract_timeout_secs == 0 {
            return Err(IngestError::InvalidConfig(
                "extraction timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref template) = c.prompt_template {
            if template.trim().is_empty() {
                return Err(IngestError::InvalidConfig(
                    "prompt template must not be blank".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = IngestConfig::builder().build().unwrap();
        assert_eq!(config.ocr_timeout_secs, 30);
        assert_eq!(config.extract_timeout_secs, 60);
        assert!(config.prompt_template.is_none());
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(IngestConfig::builder()
            .ocr_timeout_secs(0)
            .build()
            .is_err());
        assert!(IngestConfig::builder()
            .extract_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn blank_template_rejected() {
        assert!(IngestConfig::builder()
            .prompt_template("   ")
            .build()
            .is_err());
    }
}
