//! # receiptflow
//!
//! Ingest receipt images and PDFs: store the upload, read its text with OCR,
//! extract structured fields with an LLM, and persist the result in a
//! relational store.
//!
//! ## Why per-stage outcomes?
//!
//! Receipt ingestion fails in layers: the OCR engine may choke on a photo,
//! the extraction backend may be down, or its answer may not parse. None of
//! that should lose the upload. This crate commits the file and its receipt
//! row first, then runs the lossy stages and reports each one's outcome
//! (`success` / `failed` / `skipped`) individually, so callers always learn
//! exactly how far a receipt got.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Validate  content-type allow-list (images + PDF)
//!  ├─ 2. Save      original bytes via the blob store
//!  ├─ 3. Register  receipt row, state `needs_review`
//!  ├─ 4. OCR       text off the image (PDFs skipped by policy)
//!  ├─ 5. Extract   LLM call → fence-stripped JSON → structured fields
//!  ├─ 6. Persist   transaction row, then state `processed` (best-effort)
//!  └─ 7. Report    per-stage outcomes + receipt lifecycle state
//! ```
//!
//! Steps 1–3 are fatal on failure; steps 4–6 only degrade their own stage.
//! A transaction row exists for a receipt exactly when that receipt is
//! `processed`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use receiptflow::adapters::{FsBlobStore, GeminiExtractor, SqliteStore};
//! use receiptflow::{ingest, Capabilities, IngestConfig, UploadedFile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let caps = Capabilities {
//!         blobs: Arc::new(FsBlobStore::new("uploads")?),
//!         ocr: Arc::new(receiptflow::adapters::NoOcr),
//!         extractor: Arc::new(GeminiExtractor::from_env()?),
//!         store: Arc::new(SqliteStore::open("receipts.db")?),
//!     };
//!     let output = ingest(
//!         UploadedFile {
//!             original_name: "receipt.jpg".into(),
//!             content_type: "image/jpeg".into(),
//!             bytes: std::fs::read("receipt.jpg")?,
//!         },
//!         &caps,
//!         &IngestConfig::default(),
//!     )
//!     .await?;
//!     println!("receipt {} is {}", output.receipt_id, output.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature         | Default | Description |
//! |-----------------|---------|-------------|
//! | `server`        | on      | Enables the `receiptd` binary and [`server`] module (axum + clap + tracing-subscriber) |
//! | `ocr-tesseract` | off     | Native Tesseract OCR adapter (needs libtesseract/libleptonica on the build host) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod adapters;
pub mod capability;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod report;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capability::{BlobStore, Capabilities, Extractor, OcrEngine, ReceiptStore};
pub use config::{IngestConfig, IngestConfigBuilder};
pub use error::IngestError;
pub use ingest::{ingest, UploadedFile};
pub use model::{NewReceipt, NewTransaction, ParsedReceipt, Receipt, ReceiptStatus, Transaction};
pub use report::{ExtractionReport, IngestOutput, StageReport, StageStatus};
