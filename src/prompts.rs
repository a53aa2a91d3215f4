//! Prompt templates for receipt-field extraction.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the extracted field set or the
//!    output-format rules means editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the rendered prompt without
//!    calling a real extraction backend.
//!
//! Callers override the default via
//! [`crate::config::IngestConfig::prompt_template`]; the constant here is
//! used only when no override is provided.

/// Placeholder the template may use for the OCR text.
pub const RECEIPT_TEXT_PLACEHOLDER: &str = "{receipt_text}";

/// Default prompt for turning OCR text into the expected JSON object.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"Analyze the following receipt text and extract structured information in JSON format.

Extract the following information:
- date: transaction date (YYYY-MM-DD format)
- merchant_raw: merchant name as it appears
- merchant_clean: cleaned/normalized merchant name
- category: spending category (e.g., groceries, restaurant, gas, shopping, entertainment, etc.)
- amount: total amount
- currency: currency code (e.g., USD, EUR, IDR)
- confidence: your confidence level (0.0 to 1.0)

Return ONLY a valid JSON object with these fields. If you cannot extract a field, use null.
Example: {"date":"2024-01-15","merchant_raw":"WALMART #1234","merchant_clean":"Walmart","category":"groceries","amount":45.67,"currency":"USD","confidence":0.95}

Receipt Text:
{receipt_text}"#;

/// Render the extraction prompt for the given receipt text.
///
/// Templates containing [`RECEIPT_TEXT_PLACEHOLDER`] get the text
/// substituted in place. Templates without it get the text appended under a
/// `Receipt Text:` trailer, so a plain instruction block still works as a
/// template.
pub fn render_prompt(template: Option<&str>, receipt_text: &str) -> String {
    let template = template.unwrap_or(DEFAULT_EXTRACTION_PROMPT);
    if template.contains(RECEIPT_TEXT_PLACEHOLDER) {
        template.replace(RECEIPT_TEXT_PLACEHOLDER, receipt_text)
    } else {
        format!("{template}\n\nReceipt Text:\n{receipt_text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_substitutes_text() {
        let prompt = render_prompt(None, "WALMART\n$45.67");
        assert!(prompt.contains("WALMART\n$45.67"));
        assert!(!prompt.contains(RECEIPT_TEXT_PLACEHOLDER));
    }

    #[test]
    fn template_without_placeholder_gets_trailer() {
        let prompt = render_prompt(Some("Extract the totals."), "SUBTOTAL 10.00");
        assert!(prompt.starts_with("Extract the totals."));
        assert!(prompt.contains("Receipt Text:\nSUBTOTAL 10.00"));
    }

    #[test]
    fn placeholder_template_substitutes_in_place() {
        let prompt = render_prompt(Some("Text: {receipt_text} — summarise."), "abc");
        assert_eq!(prompt, "Text: abc — summarise.");
    }
}
