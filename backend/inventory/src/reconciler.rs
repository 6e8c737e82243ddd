//! Inventory reconciler: merge one `ItemGuess` into the store, exactly
//! once per call, as an atomic-per-key operation when the store allows it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use shelfscan_core::{InventoryRecord, ItemGuess, PipelineError};

use crate::store::{InventoryStore, StoreError};

/// CAS rounds before a contended key is reported as unavailable. Increments
/// commute, so a conflict normally resolves on the first re-read.
const MAX_CAS_ROUNDS: u32 = 5;

/// Canonical inventory key for a guessed label: trim, lowercase, collapse
/// whitespace runs. Idempotent.
pub fn normalize_key(label: &str) -> String {
    label
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsistencyMode {
    /// Conditional writes with re-read on conflict.
    CompareAndSwap,
    /// Plain get/put; documented small race window between concurrent
    /// writers to the same key.
    LastWriteWins,
}

pub struct Reconciler {
    store: Arc<dyn InventoryStore>,
    mode: ConsistencyMode,
}

impl Reconciler {
    /// Build a reconciler that uses compare-and-swap whenever the store
    /// offers it, falling back to last-write-wins otherwise.
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        let mode = if store.supports_cas() {
            ConsistencyMode::CompareAndSwap
        } else {
            warn!("[Reconciler] Store has no compare-and-swap; using last-write-wins");
            ConsistencyMode::LastWriteWins
        };
        Self { store, mode }
    }

    /// Force last-write-wins even on a CAS-capable store.
    pub fn last_write_wins(store: Arc<dyn InventoryStore>) -> Self {
        Self {
            store,
            mode: ConsistencyMode::LastWriteWins,
        }
    }

    /// Merge `guess` into the inventory and return the updated record.
    ///
    /// On `StorageUnavailable` the guess is untouched, so the caller can
    /// retry reconciliation without re-running recognition.
    pub async fn reconcile(&self, guess: &ItemGuess) -> Result<InventoryRecord, PipelineError> {
        let key = normalize_key(&guess.label);
        if key.is_empty() {
            return Err(PipelineError::InvalidInput(
                "guess label normalizes to an empty key".to_string(),
            ));
        }

        let record = match self.mode {
            ConsistencyMode::CompareAndSwap => self.reconcile_cas(&key, guess).await?,
            ConsistencyMode::LastWriteWins => self.reconcile_lww(&key, guess).await?,
        };
        info!(
            key = %record.key,
            quantity = record.quantity,
            "[Reconciler] Sighting recorded"
        );
        Ok(record)
    }

    async fn reconcile_cas(
        &self,
        key: &str,
        guess: &ItemGuess,
    ) -> Result<InventoryRecord, PipelineError> {
        for round in 0..MAX_CAS_ROUNDS {
            let current = self.store.get(key).await.map_err(storage_err)?;
            let updated = merge(key, current.as_ref(), guess);
            if self
                .store
                .compare_and_swap(current.as_ref(), &updated)
                .await
                .map_err(storage_err)?
            {
                return Ok(updated);
            }
            debug!(key, round, "[Reconciler] CAS conflict, re-reading");
        }
        Err(PipelineError::StorageUnavailable(format!(
            "persistent write contention on key {key:?}"
        )))
    }

    async fn reconcile_lww(
        &self,
        key: &str,
        guess: &ItemGuess,
    ) -> Result<InventoryRecord, PipelineError> {
        let current = self.store.get(key).await.map_err(storage_err)?;
        let updated = merge(key, current.as_ref(), guess);
        self.store.put(&updated).await.map_err(storage_err)?;
        Ok(updated)
    }
}

fn merge(key: &str, current: Option<&InventoryRecord>, guess: &ItemGuess) -> InventoryRecord {
    match current {
        None => InventoryRecord::first_sighting(key, guess.clone()),
        Some(existing) => {
            let mut updated = existing.clone();
            updated.record_sighting(guess.clone());
            updated
        }
    }
}

fn storage_err(err: StoreError) -> PipelineError {
    PipelineError::StorageUnavailable(err.to_string())
}
