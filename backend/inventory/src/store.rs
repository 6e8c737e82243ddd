//! Persistence gateway boundary: `get`/`put`/`list` with optional
//! compare-and-swap, plus the in-memory reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use shelfscan_core::InventoryRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("compare-and-swap not supported by this store")]
    CasUnsupported,
}

/// Abstract interface over the inventory document store.
///
/// Any key-value backend with last-write-wins `put` semantics satisfies
/// this trait. Backends that can do atomic conditional writes additionally
/// report `supports_cas()` and implement `compare_and_swap`; the reconciler
/// prefers that path and only falls back to read-then-overwrite (with its
/// documented small race window) when the backend cannot do better.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<InventoryRecord>, StoreError>;

    /// Unconditional write (last-write-wins).
    async fn put(&self, record: &InventoryRecord) -> Result<(), StoreError>;

    /// All records, most recently seen first.
    async fn list(&self) -> Result<Vec<InventoryRecord>, StoreError>;

    fn supports_cas(&self) -> bool {
        false
    }

    /// Write `new` only if the stored record for `new.key` still matches
    /// `expected` (`None` = key must be absent; `Some` compares quantity).
    /// Returns `Ok(false)` on conflict so the caller can re-read and retry.
    async fn compare_and_swap(
        &self,
        expected: Option<&InventoryRecord>,
        new: &InventoryRecord,
    ) -> Result<bool, StoreError> {
        let _ = (expected, new);
        Err(StoreError::CasUnsupported)
    }
}

/// In-memory inventory store over a `RwLock<HashMap>`.
///
/// CAS-capable by default; `last_write_wins()` builds one that denies CAS so
/// the reconciler's overwrite fallback can be exercised in tests.
pub struct MemoryInventoryStore {
    records: RwLock<HashMap<String, InventoryRecord>>,
    cas_capable: bool,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            cas_capable: true,
        }
    }

    /// A store that only offers simple overwrite semantics.
    pub fn last_write_wins() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            cas_capable: false,
        }
    }
}

impl Default for MemoryInventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn get(&self, key: &str) -> Result<Option<InventoryRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, record: &InventoryRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let mut records: Vec<InventoryRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(records)
    }

    fn supports_cas(&self) -> bool {
        self.cas_capable
    }

    async fn compare_and_swap(
        &self,
        expected: Option<&InventoryRecord>,
        new: &InventoryRecord,
    ) -> Result<bool, StoreError> {
        if !self.cas_capable {
            return Err(StoreError::CasUnsupported);
        }
        let mut records = self.records.write().await;
        let matches = match (records.get(&new.key), expected) {
            (None, None) => true,
            (Some(current), Some(expected)) => current.quantity == expected.quantity,
            _ => false,
        };
        if matches {
            records.insert(new.key.clone(), new.clone());
        }
        Ok(matches)
    }
}
