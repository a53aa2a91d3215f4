//! Persistence stage: transaction insert and lifecycle advance.
//!
//! Best-effort by contract: a failed insert leaves the receipt in
//! `needs_review` and is **not** surfaced as a request error. It is logged
//! on the dedicated `receiptflow::persistence` target so operators can
//! alert on silent persistence loss separately from ordinary stage noise.
//!
//! The status update runs only after a successful insert, preserving the
//! invariant that a `processed` receipt always has its transaction row.

use crate::capability::ReceiptStore;
use crate::model::{ParsedReceipt, ReceiptStatus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Persist the parsed fields for `receipt_id`; returns the lifecycle state
/// as observed after this stage.
pub async fn run(
    store: &Arc<dyn ReceiptStore>,
    receipt_id: i64,
    parsed: &ParsedReceipt,
) -> ReceiptStatus {
    let transaction = parsed.to_transaction(receipt_id);

    if let Err(e) = store.insert_transaction(transaction).await {
        warn!(
            target: "receiptflow::persistence",
            receipt_id,
            "transaction insert failed, receipt stays needs_review: {e:#}"
        );
        return ReceiptStatus::NeedsReview;
    }

    match store
        .update_status(receipt_id, ReceiptStatus::Processed)
        .await
    {
        Ok(()) => {
            debug!(receipt_id, "receipt processed");
            ReceiptStatus::Processed
        }
        Err(e) => {
            // The transaction row committed but the lifecycle did not
            // advance; the stored state is inconsistent until an operator
            // intervenes, so this logs louder than the insert failure.
            warn!(
                target: "receiptflow::persistence",
                receipt_id,
                "status update failed after transaction insert: {e:#}"
            );
            ReceiptStatus::NeedsReview
        }
    }
}
