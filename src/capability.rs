//! Boundary capabilities consumed by the pipeline.
//!
//! The pipeline has no algorithmic opinion about how bytes are stored, how
//! text is read off an image, how the extraction backend is reached, or what
//! database sits behind the store. Each of those is a narrow async trait
//! here, injected via [`Capabilities`], so production adapters
//! ([`crate::adapters`]) and test fakes are interchangeable.
//!
//! Errors at this boundary are opaque (`anyhow`): the pipeline only ever
//! stringifies them into a stage report or a fatal [`crate::IngestError`].

use crate::model::{NewReceipt, NewTransaction, ReceiptStatus};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Durable storage for the original upload bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under `name` and return the resulting path.
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Text extraction from image bytes.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extract text from the image. An empty string is a valid result.
    async fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}

/// The LLM-backed text-to-structured-JSON service.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Submit the rendered prompt; return the raw response text.
    async fn analyze(&self, prompt: &str) -> Result<String>;
}

/// The relational store holding receipts and transactions.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Insert a receipt row; returns the assigned row id.
    async fn insert_receipt(&self, receipt: NewReceipt) -> Result<i64>;

    /// Update the lifecycle state of an existing receipt.
    async fn update_status(&self, receipt_id: i64, status: ReceiptStatus) -> Result<()>;

    /// Insert a transaction row; returns the assigned row id.
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<i64>;
}

/// The full set of capabilities one pipeline run needs.
///
/// Cheap to clone; each slot is a shared handle.
#[derive(Clone)]
pub struct Capabilities {
    pub blobs: Arc<dyn BlobStore>,
    pub ocr: Arc<dyn OcrEngine>,
    pub extractor: Arc<dyn Extractor>,
    pub store: Arc<dyn ReceiptStore>,
}
