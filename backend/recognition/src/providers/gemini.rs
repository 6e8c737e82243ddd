//! Gemini vision candidate: `generateContent` with inline image data.

use std::time::Instant;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use shelfscan_core::{ProviderError, VisionModel, VisionRequest, VisionResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `finishReason` values that mean the safety filter refused.
const SAFETY_FINISH_REASONS: [&str; 3] = ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST"];

pub struct GeminiVisionModel {
    model: String,
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiVisionModel {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API endpoint (for testing against a local stub).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl VisionModel for GeminiVisionModel {
    fn id(&self) -> &str {
        &self.model
    }

    async fn describe(&self, request: &VisionRequest) -> Result<VisionResponse, ProviderError> {
        let started = Instant::now();
        debug!(model = %self.model, "[Gemini] Describing image");

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [
                { "text": request.prompt },
                { "inlineData": {
                    "mimeType": request.mime_type,
                    "data": STANDARD.encode(&request.image)
                } }
            ]}]
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ProviderError::QuotaExceeded(detail));
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "Gemini returned {status}: {detail}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        // A prompt-level block carries no candidates at all.
        if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
            return Err(ProviderError::SafetyBlocked(reason.to_string()));
        }
        if let Some(reason) = json["candidates"][0]["finishReason"].as_str() {
            if SAFETY_FINISH_REASONS.contains(&reason) {
                return Err(ProviderError::SafetyBlocked(reason.to_string()));
            }
        }

        let text = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();
        if text.is_empty() {
            return Err(ProviderError::Malformed(
                "Gemini response carried no text".to_string(),
            ));
        }

        Ok(VisionResponse {
            model_id: self.model.clone(),
            text,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}
