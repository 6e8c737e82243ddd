//! SQLite-backed durable inventory store.
//!
//! One row per normalized key; sighting history is serialized as JSON in
//! the row. Conditional single-statement writes give true compare-and-swap
//! (SQLite serializes writers), so this store reports `supports_cas()`.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tokio::sync::Mutex;
use tracing::info;

use shelfscan_core::{InventoryRecord, ItemGuess};

use crate::store::{InventoryStore, StoreError};

pub struct SqliteInventoryStore {
    conn: Mutex<Connection>,
}

impl SqliteInventoryStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite inventory database")?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS inventory (
                 key          TEXT PRIMARY KEY,
                 quantity     INTEGER NOT NULL,
                 last_seen    TEXT NOT NULL,
                 history_json TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_inventory_last_seen ON inventory(last_seen);",
        )
        .context("Failed to initialize inventory schema")?;

        info!("SqliteInventoryStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS inventory (
                 key          TEXT PRIMARY KEY,
                 quantity     INTEGER NOT NULL,
                 last_seen    TEXT NOT NULL,
                 history_json TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(String, i64, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_record(
    key: String,
    quantity: i64,
    last_seen: String,
    history_json: String,
) -> Result<InventoryRecord, StoreError> {
    let last_seen: DateTime<Utc> = last_seen
        .parse()
        .map_err(|e| StoreError::Unavailable(format!("corrupt last_seen for {key:?}: {e}")))?;
    let history: Vec<ItemGuess> = serde_json::from_str(&history_json)
        .map_err(|e| StoreError::Unavailable(format!("corrupt history for {key:?}: {e}")))?;
    Ok(InventoryRecord { key, quantity: quantity.max(0) as u64, last_seen, history })
}

fn encode_history(record: &InventoryRecord) -> Result<String, StoreError> {
    serde_json::to_string(&record.history)
        .map_err(|e| StoreError::Unavailable(format!("unserializable history: {e}")))
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl InventoryStore for SqliteInventoryStore {
    async fn get(&self, key: &str) -> Result<Option<InventoryRecord>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT key, quantity, last_seen, history_json FROM inventory WHERE key = ?1")
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(params![key], row_to_record)
            .map_err(db_err)?;
        match rows.next() {
            Some(row) => {
                let (key, quantity, last_seen, history_json) = row.map_err(db_err)?;
                Ok(Some(decode_record(key, quantity, last_seen, history_json)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: &InventoryRecord) -> Result<(), StoreError> {
        let history_json = encode_history(record)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO inventory (key, quantity, last_seen, history_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                 quantity = excluded.quantity,
                 last_seen = excluded.last_seen,
                 history_json = excluded.history_json",
            params![
                record.key,
                record.quantity as i64,
                record.last_seen.to_rfc3339(),
                history_json,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT key, quantity, last_seen, history_json
                 FROM inventory ORDER BY last_seen DESC",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([], row_to_record).map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (key, quantity, last_seen, history_json) = row.map_err(db_err)?;
            records.push(decode_record(key, quantity, last_seen, history_json)?);
        }
        Ok(records)
    }

    fn supports_cas(&self) -> bool {
        true
    }

    async fn compare_and_swap(
        &self,
        expected: Option<&InventoryRecord>,
        new: &InventoryRecord,
    ) -> Result<bool, StoreError> {
        let history_json = encode_history(new)?;
        let conn = self.conn.lock().await;
        let changed = match expected {
            // Insert-if-absent.
            None => conn
                .execute(
                    "INSERT INTO inventory (key, quantity, last_seen, history_json)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO NOTHING",
                    params![
                        new.key,
                        new.quantity as i64,
                        new.last_seen.to_rfc3339(),
                        history_json,
                    ],
                )
                .map_err(db_err)?,
            // Update-if-unchanged, guarded on the previously read quantity.
            Some(expected) => conn
                .execute(
                    "UPDATE inventory
                     SET quantity = ?2, last_seen = ?3, history_json = ?4
                     WHERE key = ?1 AND quantity = ?5",
                    params![
                        new.key,
                        new.quantity as i64,
                        new.last_seen.to_rfc3339(),
                        history_json,
                        expected.quantity as i64,
                    ],
                )
                .map_err(db_err)?,
        };
        Ok(changed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str) -> InventoryRecord {
        InventoryRecord::first_sighting(key, ItemGuess::new(key, "raw"))
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let store = SqliteInventoryStore::in_memory().unwrap();
        let mut mug = record("mug");
        mug.record_sighting(ItemGuess::new("Mug", "seen again"));
        store.put(&mug).await.unwrap();

        let fetched = store.get("mug").await.unwrap().unwrap();
        assert_eq!(fetched.quantity, 2);
        assert_eq!(fetched.history.len(), 2);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_most_recent_first() {
        let store = SqliteInventoryStore::in_memory().unwrap();
        let older = record("older");
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let newer = record("newer");
        store.put(&older).await.unwrap();
        store.put(&newer).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key, "newer");
    }

    #[tokio::test]
    async fn cas_insert_is_exclusive() {
        let store = SqliteInventoryStore::in_memory().unwrap();
        assert!(store.compare_and_swap(None, &record("mug")).await.unwrap());
        assert!(!store.compare_and_swap(None, &record("mug")).await.unwrap());
    }

    #[tokio::test]
    async fn cas_update_detects_stale_read() {
        let store = SqliteInventoryStore::in_memory().unwrap();
        let first = record("mug");
        store.put(&first).await.unwrap();

        let mut updated = first.clone();
        updated.record_sighting(ItemGuess::new("Mug", "raw"));
        assert!(store.compare_and_swap(Some(&first), &updated).await.unwrap());
        assert!(!store.compare_and_swap(Some(&first), &updated).await.unwrap());
    }
}
