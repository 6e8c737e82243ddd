//! Typed configuration schema for ShelfScan, serde YAML/JSON
//! deserialization with camelCase field names.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfScanConfig {
    /// Provider credentials, usually `${ENV_VAR}` references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<ProvidersConfig>,

    /// Ordered model candidate list, primary first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,

    /// Retry/timeout policy for recognition attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognition: Option<RecognitionConfig>,

    /// Inventory store backend selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ProviderCredential>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<ProviderCredential>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredential {
    pub api_key: String,

    /// Endpoint override, mainly for tests against a local stub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    /// Per-attempt timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_ms: Option<u64>,

    /// Same-model retries after a transport error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_transport_retries: Option<u32>,

    /// Base backoff between transport retries in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,

    /// Largest accepted image payload in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryConfig {
    /// "sqlite" or "memory".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    /// Database path for the sqlite backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// "compare-and-swap" or "last-write-wins".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for the rolling NDJSON log file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}
