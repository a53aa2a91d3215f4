//! Persistent entities: receipts and the transactions derived from them.
//!
//! A [`Receipt`] tracks one upload and its processing lifecycle. A
//! [`Transaction`] is the structured financial record created once extraction
//! succeeds. The lifecycle state is the single source of truth for "has this
//! receipt been fully parsed": a transaction row exists for a receipt exactly
//! when that receipt is [`ReceiptStatus::Processed`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// Stored and registered; extraction has not (yet) produced a transaction.
    NeedsReview,
    /// A transaction was derived and persisted.
    Processed,
    /// Reserved for out-of-band tooling; the pipeline never assigns it.
    Error,
}

impl ReceiptStatus {
    /// Stable text form used in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::NeedsReview => "needs_review",
            ReceiptStatus::Processed => "processed",
            ReceiptStatus::Error => "error",
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needs_review" => Ok(ReceiptStatus::NeedsReview),
            "processed" => Ok(ReceiptStatus::Processed),
            "error" => Ok(ReceiptStatus::Error),
            other => Err(anyhow::anyhow!("unknown receipt status '{other}'")),
        }
    }
}

/// A tracked upload, as stored.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub id: i64,
    pub uuid: Uuid,
    pub stored_name: String,
    pub original_name: String,
    pub content_type: String,
    pub status: ReceiptStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// Receipt fields for insertion; the store assigns the row id.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub uuid: Uuid,
    pub stored_name: String,
    pub original_name: String,
    pub content_type: String,
    pub status: ReceiptStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// The structured financial record derived from a receipt, as stored.
///
/// Every extracted field is nullable: the extraction capability may fail to
/// read any given field off the receipt.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub receipt_id: i64,
    pub date: Option<NaiveDate>,
    pub merchant_raw: Option<String>,
    pub merchant_clean: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Transaction fields for insertion; the store assigns id and created_at.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub receipt_id: i64,
    pub date: Option<NaiveDate>,
    pub merchant_raw: Option<String>,
    pub merchant_clean: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub confidence: Option<f64>,
}

/// The JSON shape the extraction capability is prompted to return.
///
/// Every field is optional and defaults to `None`, so missing keys and
/// explicit `null`s both deserialise cleanly. Values are normalised when
/// converting to a [`NewTransaction`], not here — the raw parse is kept
/// verbatim for the response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub merchant_raw: Option<String>,
    #[serde(default)]
    pub merchant_clean: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ParsedReceipt {
    /// Build the transaction row for `receipt_id`, applying absence rules:
    ///
    /// * empty strings are absent;
    /// * `amount`/`confidence` ≤ 0 are absent, never stored as the literal
    ///   value;
    /// * a date that does not parse as `YYYY-MM-DD` is absent.
    pub fn to_transaction(&self, receipt_id: i64) -> NewTransaction {
        NewTransaction {
            receipt_id,
            date: self
                .date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            merchant_raw: non_empty(&self.merchant_raw),
            merchant_clean: non_empty(&self.merchant_clean),
            category: non_empty(&self.category),
            amount: positive(self.amount),
            currency: non_empty(&self.currency),
            confidence: positive(self.confidence),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_parse() -> ParsedReceipt {
        ParsedReceipt {
            date: Some("2024-01-15".into()),
            merchant_raw: Some("WALMART #1234".into()),
            merchant_clean: Some("Walmart".into()),
            category: Some("groceries".into()),
            amount: Some(45.67),
            currency: Some("USD".into()),
            confidence: Some(0.95),
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ReceiptStatus::NeedsReview,
            ReceiptStatus::Processed,
            ReceiptStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<ReceiptStatus>().unwrap(), status);
        }
        assert!("shredded".parse::<ReceiptStatus>().is_err());
    }

    #[test]
    fn full_parse_converts_every_field() {
        let tx = full_parse().to_transaction(7);
        assert_eq!(tx.receipt_id, 7);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(tx.merchant_raw.as_deref(), Some("WALMART #1234"));
        assert_eq!(tx.merchant_clean.as_deref(), Some("Walmart"));
        assert_eq!(tx.amount, Some(45.67));
        assert_eq!(tx.confidence, Some(0.95));
    }

    #[test]
    fn zero_and_negative_amounts_are_absent() {
        let mut parse = full_parse();
        parse.amount = Some(0.0);
        parse.confidence = Some(-0.3);
        let tx = parse.to_transaction(1);
        assert_eq!(tx.amount, None);
        assert_eq!(tx.confidence, None);
    }

    #[test]
    fn empty_strings_are_absent() {
        let mut parse = full_parse();
        parse.merchant_raw = Some(String::new());
        parse.currency = Some("  ".into());
        let tx = parse.to_transaction(1);
        assert_eq!(tx.merchant_raw, None);
        assert_eq!(tx.currency, None);
    }

    #[test]
    fn unparseable_date_is_absent() {
        let mut parse = full_parse();
        parse.date = Some("01/15/2024".into());
        assert_eq!(parse.to_transaction(1).date, None);
    }

    #[test]
    fn nulls_and_missing_keys_deserialise() {
        let parsed: ParsedReceipt =
            serde_json::from_str(r#"{"date":null,"amount":12.5}"#).unwrap();
        assert_eq!(parsed.date, None);
        assert_eq!(parsed.amount, Some(12.5));
        assert_eq!(parsed.merchant_clean, None);
    }
}
