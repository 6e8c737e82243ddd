use async_trait::async_trait;

use crate::error::ProviderError;

/// One image+prompt payload sent to a vision model.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub image: Vec<u8>,
    /// MIME type of the image bytes (e.g. "image/jpeg").
    pub mime_type: String,
    pub prompt: String,
}

/// Raw successful response from a vision model, before normalization.
#[derive(Debug, Clone)]
pub struct VisionResponse {
    pub model_id: String,
    pub text: String,
    pub latency_ms: u64,
}

/// Trait for vision-capable model candidates.
///
/// Implementations classify their own failures: a provider-flagged safety
/// refusal must surface as `ProviderError::SafetyBlocked`, rate limiting as
/// `QuotaExceeded`, and network/HTTP trouble as `Transport`.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Candidate identifier as it appears in the configured model list
    /// (e.g. "gemini-2.0-flash").
    fn id(&self) -> &str;

    /// Describe the image, returning the provider's raw text.
    async fn describe(&self, request: &VisionRequest) -> Result<VisionResponse, ProviderError>;
}
