//! Scripted mock vision model for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use shelfscan_core::{ProviderError, VisionModel, VisionRequest, VisionResponse};

#[derive(Debug, Clone)]
enum MockBehavior {
    Respond(String),
    SafetyBlock,
    TransportError,
    QuotaExceeded,
}

/// A mock vision model with a per-call script and a call counter, so tests
/// can assert both fallback order and how often each candidate was tried.
///
/// Scripted behaviors (`then_*`) are consumed first, one per call; once the
/// script is drained the default behavior (`with_*` / `always_*`) applies.
pub struct MockVisionModel {
    id: String,
    script: Mutex<VecDeque<MockBehavior>>,
    default: MockBehavior,
    calls: AtomicUsize,
}

impl MockVisionModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(VecDeque::new()),
            default: MockBehavior::Respond("Mock Item".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with this text (once the script is drained).
    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.default = MockBehavior::Respond(text.into());
        self
    }

    /// Always report a safety refusal.
    pub fn with_safety_block(mut self) -> Self {
        self.default = MockBehavior::SafetyBlock;
        self
    }

    /// Always fail with a transport error.
    pub fn always_transport_error(mut self) -> Self {
        self.default = MockBehavior::TransportError;
        self
    }

    /// Always fail with quota exhaustion.
    pub fn always_quota_exceeded(mut self) -> Self {
        self.default = MockBehavior::QuotaExceeded;
        self
    }

    /// Script one transport error for the next unscripted call.
    pub fn then_transport_error(self) -> Self {
        self.push(MockBehavior::TransportError);
        self
    }

    /// Script one successful response for the next unscripted call.
    pub fn then_response(self, text: impl Into<String>) -> Self {
        self.push(MockBehavior::Respond(text.into()));
        self
    }

    /// Number of `describe` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(&self, behavior: MockBehavior) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(behavior);
    }

    fn next_behavior(&self) -> MockBehavior {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn describe(&self, _request: &VisionRequest) -> Result<VisionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_behavior() {
            MockBehavior::Respond(text) => Ok(VisionResponse {
                model_id: self.id.clone(),
                text,
                latency_ms: 0,
            }),
            MockBehavior::SafetyBlock => Err(ProviderError::SafetyBlocked(
                "mock safety filter".to_string(),
            )),
            MockBehavior::TransportError => {
                Err(ProviderError::Transport("mock connection reset".to_string()))
            }
            MockBehavior::QuotaExceeded => {
                Err(ProviderError::QuotaExceeded("mock 429".to_string()))
            }
        }
    }
}
