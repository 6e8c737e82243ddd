//! Inventory subsystem: the persistence gateway boundary and the
//! reconciler that merges recognition results into it.
//!
//! The core holds no process-wide mutable state; all shared inventory
//! state lives behind the `InventoryStore` trait.

pub mod reconciler;
pub mod sqlite_store;
pub mod store;

pub use reconciler::{normalize_key, Reconciler};
pub use sqlite_store::SqliteInventoryStore;
pub use store::{InventoryStore, MemoryInventoryStore, StoreError};
