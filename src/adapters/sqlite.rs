//! SQLite-backed receipt store.
//!
//! Uses `rusqlite` with the bundled engine so no system SQLite is needed.
//! The connection sits behind an async mutex; every query holds the lock for
//! one statement only, which is plenty for the write rates a per-request
//! pipeline produces. Schema creation is idempotent and runs on open.

use crate::capability::ReceiptStore;
use crate::model::{NewReceipt, NewTransaction, Receipt, ReceiptStatus, Transaction};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS receipts (
    id            INTEGER PRIMARY KEY,
    uuid          TEXT NOT NULL UNIQUE,
    stored_name   TEXT NOT NULL,
    original_name TEXT NOT NULL,
    content_type  TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'needs_review',
    uploaded_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_receipts_status ON receipts(status);
CREATE INDEX IF NOT EXISTS idx_receipts_uploaded_at ON receipts(uploaded_at);

CREATE TABLE IF NOT EXISTS transactions (
    id             INTEGER PRIMARY KEY,
    receipt_id     INTEGER NOT NULL,
    date           TEXT,
    merchant_raw   TEXT,
    merchant_clean TEXT,
    category       TEXT,
    amount         REAL,
    currency       TEXT,
    confidence     REAL,
    created_at     TEXT NOT NULL,
    FOREIGN KEY (receipt_id) REFERENCES receipts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_transactions_receipt_id ON transactions(receipt_id);
CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("failed to open database {}", path.as_ref().display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("failed to configure database")?;
        conn.execute_batch(SCHEMA)
            .context("failed to initialise receipts schema")?;
        info!("receipt store opened at {}", path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (tests, throwaway runs).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fetch one receipt by row id.
    pub async fn receipt(&self, id: i64) -> Result<Option<Receipt>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, uuid, stored_name, original_name, content_type, status, uploaded_at
             FROM receipts WHERE id = ?1",
        )?;
        let row = stmt
            .query_map(params![id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .next()
            .transpose()?;

        match row {
            None => Ok(None),
            Some((id, uuid, stored_name, original_name, content_type, status, uploaded_at)) => {
                Ok(Some(Receipt {
                    id,
                    uuid: Uuid::parse_str(&uuid).context("malformed uuid in store")?,
                    stored_name,
                    original_name,
                    content_type,
                    status: status.parse()?,
                    uploaded_at: parse_timestamp(&uploaded_at)?,
                }))
            }
        }
    }

    /// Fetch the transaction derived from a receipt, if any.
    pub async fn transaction_for_receipt(&self, receipt_id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, receipt_id, date, merchant_raw, merchant_clean, category,
                    amount, currency, confidence, created_at
             FROM transactions WHERE receipt_id = ?1",
        )?;
        let row = stmt
            .query_map(params![receipt_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<f64>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<f64>>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })?
            .next()
            .transpose()?;

        match row {
            None => Ok(None),
            Some((
                id,
                receipt_id,
                date,
                merchant_raw,
                merchant_clean,
                category,
                amount,
                currency,
                confidence,
                created_at,
            )) => Ok(Some(Transaction {
                id,
                receipt_id,
                date: date
                    .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
                    .transpose()
                    .context("malformed date in store")?,
                merchant_raw,
                merchant_clean,
                category,
                amount,
                currency,
                confidence,
                created_at: parse_timestamp(&created_at)?,
            })),
        }
    }
}

#[async_trait]
impl ReceiptStore for SqliteStore {
    async fn insert_receipt(&self, receipt: NewReceipt) -> Result<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO receipts (uuid, stored_name, original_name, content_type, status, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                receipt.uuid.to_string(),
                receipt.stored_name,
                receipt.original_name,
                receipt.content_type,
                receipt.status.as_str(),
                receipt.uploaded_at.to_rfc3339(),
            ],
        )
        .context("failed to insert receipt")?;
        Ok(conn.last_insert_rowid())
    }

    async fn update_status(&self, receipt_id: i64, status: ReceiptStatus) -> Result<()> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE receipts SET status = ?1 WHERE id = ?2",
                params![status.as_str(), receipt_id],
            )
            .context("failed to update receipt status")?;
        if changed == 0 {
            bail!("no receipt with id {receipt_id}");
        }
        Ok(())
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO transactions (receipt_id, date, merchant_raw, merchant_clean, category,
                                       amount, currency, confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                transaction.receipt_id,
                transaction.date.map(|d| d.to_string()),
                transaction.merchant_raw,
                transaction.merchant_clean,
                transaction.category,
                transaction.amount,
                transaction.currency,
                transaction.confidence,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("failed to insert transaction")?;
        Ok(conn.last_insert_rowid())
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("malformed timestamp in store")?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_receipt() -> NewReceipt {
        NewReceipt {
            uuid: Uuid::new_v4(),
            stored_name: "abc_20240115_093005.jpg".into(),
            original_name: "receipt.jpg".into(),
            content_type: "image/jpeg".into(),
            status: ReceiptStatus::NeedsReview,
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_receipt() {
        let store = SqliteStore::in_memory().unwrap();
        let new = sample_receipt();
        let id = store.insert_receipt(new.clone()).await.unwrap();

        let receipt = store.receipt(id).await.unwrap().unwrap();
        assert_eq!(receipt.uuid, new.uuid);
        assert_eq!(receipt.stored_name, new.stored_name);
        assert_eq!(receipt.status, ReceiptStatus::NeedsReview);
    }

    #[tokio::test]
    async fn update_status_round_trips() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store.insert_receipt(sample_receipt()).await.unwrap();

        store
            .update_status(id, ReceiptStatus::Processed)
            .await
            .unwrap();
        let receipt = store.receipt(id).await.unwrap().unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Processed);
    }

    #[tokio::test]
    async fn update_status_of_missing_receipt_errors() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store
            .update_status(999, ReceiptStatus::Processed)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn transaction_round_trips_with_nullable_fields() {
        let store = SqliteStore::in_memory().unwrap();
        let receipt_id = store.insert_receipt(sample_receipt()).await.unwrap();

        store
            .insert_transaction(NewTransaction {
                receipt_id,
                date: NaiveDate::from_ymd_opt(2024, 1, 15),
                merchant_raw: Some("WALMART #1234".into()),
                merchant_clean: Some("Walmart".into()),
                category: None,
                amount: Some(45.67),
                currency: Some("USD".into()),
                confidence: None,
            })
            .await
            .unwrap();

        let tx = store
            .transaction_for_receipt(receipt_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(tx.amount, Some(45.67));
        assert_eq!(tx.category, None);
        assert_eq!(tx.confidence, None);
    }

    #[tokio::test]
    async fn transaction_requires_existing_receipt() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store
            .insert_transaction(NewTransaction {
                receipt_id: 42,
                date: None,
                merchant_raw: None,
                merchant_clean: None,
                category: None,
                amount: None,
                currency: None,
                confidence: None,
            })
            .await;
        assert!(result.is_err(), "foreign key should reject orphan rows");
    }

    #[tokio::test]
    async fn schema_is_idempotent_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipts.db");
        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_receipt(sample_receipt()).await.unwrap()
        };
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.receipt(id).await.unwrap().is_some());
    }
}
