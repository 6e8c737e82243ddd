//! Config defaults: applies sensible default values to parsed config.

use crate::schema::{InventoryConfig, LoggingConfig, RecognitionConfig, ShelfScanConfig};

/// Default per-attempt provider timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 20_000;

/// Default same-model retries after a transport error.
pub const DEFAULT_MAX_TRANSPORT_RETRIES: u32 = 2;

/// Default base backoff between transport retries.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Default image payload limit (8 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

/// Default ordered model candidates, primary first.
pub const DEFAULT_MODELS: [&str; 3] = ["gemini-2.0-flash", "gemini-1.5-flash", "gpt-4o-mini"];

pub const DEFAULT_INVENTORY_BACKEND: &str = "sqlite";
pub const DEFAULT_INVENTORY_PATH: &str = "inventory.db";
pub const DEFAULT_CONSISTENCY: &str = "compare-and-swap";

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ShelfScanConfig) -> ShelfScanConfig {
    let config = apply_model_defaults(config);
    let config = apply_recognition_defaults(config);
    let config = apply_inventory_defaults(config);
    apply_logging_defaults(config)
}

fn apply_model_defaults(mut config: ShelfScanConfig) -> ShelfScanConfig {
    let models = config.models.get_or_insert_with(Vec::new);
    if models.is_empty() {
        models.extend(DEFAULT_MODELS.iter().map(|m| m.to_string()));
    }
    config
}

fn apply_recognition_defaults(mut config: ShelfScanConfig) -> ShelfScanConfig {
    let recognition = config
        .recognition
        .get_or_insert_with(RecognitionConfig::default);
    recognition
        .attempt_timeout_ms
        .get_or_insert(DEFAULT_ATTEMPT_TIMEOUT_MS);
    recognition
        .max_transport_retries
        .get_or_insert(DEFAULT_MAX_TRANSPORT_RETRIES);
    recognition
        .retry_backoff_ms
        .get_or_insert(DEFAULT_RETRY_BACKOFF_MS);
    recognition
        .max_image_bytes
        .get_or_insert(DEFAULT_MAX_IMAGE_BYTES);
    config
}

fn apply_inventory_defaults(mut config: ShelfScanConfig) -> ShelfScanConfig {
    let inventory = config.inventory.get_or_insert_with(InventoryConfig::default);
    inventory
        .backend
        .get_or_insert_with(|| DEFAULT_INVENTORY_BACKEND.to_string());
    inventory
        .path
        .get_or_insert_with(|| DEFAULT_INVENTORY_PATH.to_string());
    inventory
        .consistency
        .get_or_insert_with(|| DEFAULT_CONSISTENCY.to_string());
    config
}

fn apply_logging_defaults(mut config: ShelfScanConfig) -> ShelfScanConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}
