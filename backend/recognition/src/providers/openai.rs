//! OpenAI vision candidate: chat completions with a data-URL image part.

use std::time::Instant;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use shelfscan_core::{ProviderError, VisionModel, VisionRequest, VisionResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiVisionModel {
    model: String,
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiVisionModel {
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
impl VisionModel for OpenAiVisionModel {
    fn id(&self) -> &str {
        &self.model
    }

    async fn describe(&self, request: &VisionRequest) -> Result<VisionResponse, ProviderError> {
        let started = Instant::now();
        debug!(model = %self.model, "[OpenAI] Describing image");

        let data_url = format!(
            "data:{};base64,{}",
            request.mime_type,
            STANDARD.encode(&request.image)
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": request.prompt },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "max_tokens": 512
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
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
            if detail.contains("content_policy") {
                return Err(ProviderError::SafetyBlocked(detail));
            }
            return Err(ProviderError::Transport(format!(
                "OpenAI returned {status}: {detail}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let choice = &json["choices"][0];
        if let Some(refusal) = choice["message"]["refusal"].as_str() {
            return Err(ProviderError::SafetyBlocked(refusal.to_string()));
        }
        if choice["finish_reason"].as_str() == Some("content_filter") {
            return Err(ProviderError::SafetyBlocked(
                "finish_reason=content_filter".to_string(),
            ));
        }

        let text = choice["message"]["content"].as_str().unwrap_or("").to_string();
        if text.is_empty() {
            return Err(ProviderError::Malformed(
                "OpenAI response carried no text".to_string(),
            ));
        }

        Ok(VisionResponse {
            model_id: self.model.clone(),
            text,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}
