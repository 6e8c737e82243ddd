//! Recognition orchestrator: drives the candidate chain with the
//! retry/fallback policy and produces exactly one `ItemGuess` or a
//! terminal failure.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use shelfscan_core::{
    AttemptOutcome, ItemGuess, ModelAttempt, PipelineError, ProviderError, VisionRequest,
};

use crate::normalizer::normalize_response;
use crate::selector::ModelSelector;

/// Prompt sent with every image. Asks for the structured attribute JSON the
/// normalizer prefers, while tolerating prose answers.
const RECOGNITION_PROMPT: &str = r#"Analyze the object in this image and respond with a single JSON object with these keys:
- "main_object": (string) the generic name of the main object (e.g. "mug", "keyboard", "screwdriver")
- "main_color": (string) the dominant color
- "shape": (string) a short description of the main shape
- "material": (string) your best guess at the primary material
- "features": (array of strings) notable visual features
- "confidence": (number) how confident you are in main_object, from 0 to 1
Respond with only the JSON object."#;

/// Tunable recognition policy, consumed from configuration.
#[derive(Debug, Clone)]
pub struct RecognitionPolicy {
    /// Timeout applied to each individual provider call.
    pub attempt_timeout: Duration,
    /// Same-model retries allowed after a transport error.
    pub max_transport_retries: u32,
    /// Base backoff between transport retries; doubles per retry.
    pub retry_backoff: Duration,
    /// Largest accepted image payload, in bytes.
    pub max_image_bytes: usize,
}

impl Default for RecognitionPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(20),
            max_transport_retries: 2,
            retry_backoff: Duration::from_millis(500),
            max_image_bytes: 8 * 1024 * 1024,
        }
    }
}

pub struct Orchestrator {
    selector: ModelSelector,
    policy: RecognitionPolicy,
}

impl Orchestrator {
    pub fn new(selector: ModelSelector, policy: RecognitionPolicy) -> Self {
        Self { selector, policy }
    }

    /// Recognize the item in `image`, trying each candidate in order.
    ///
    /// Returns the first successfully normalized guess together with the
    /// full attempt log. The sequence of attempts is deterministic for a
    /// given (image, hint, candidate list): candidates are tried strictly
    /// in configured order, and only transport errors earn bounded
    /// same-model retries with exponential backoff. Safety blocks, quota
    /// exhaustion, and malformed output advance to the next candidate
    /// immediately.
    pub async fn recognize(
        &self,
        image: &[u8],
        mime_type: &str,
        hint: Option<&str>,
    ) -> Result<(ItemGuess, Vec<ModelAttempt>), PipelineError> {
        if image.is_empty() {
            return Err(PipelineError::InvalidInput("empty image".to_string()));
        }
        if image.len() > self.policy.max_image_bytes {
            return Err(PipelineError::InvalidInput(format!(
                "image is {} bytes, limit is {}",
                image.len(),
                self.policy.max_image_bytes
            )));
        }

        let request = VisionRequest {
            image: image.to_vec(),
            mime_type: mime_type.to_string(),
            prompt: build_prompt(hint),
        };

        let mut attempts: Vec<ModelAttempt> = Vec::new();

        for model in self.selector.candidates() {
            let mut retries_left = self.policy.max_transport_retries;
            let mut backoff = self.policy.retry_backoff;

            loop {
                let started = std::time::Instant::now();
                let outcome = timeout(self.policy.attempt_timeout, model.describe(&request))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ProviderError::Transport(format!(
                            "attempt timed out after {:?}",
                            self.policy.attempt_timeout
                        )))
                    });
                let latency_ms = started.elapsed().as_millis() as u64;

                match outcome {
                    Ok(response) => match normalize_response(&response.text) {
                        Ok(guess) => {
                            attempts.push(ModelAttempt {
                                model_id: model.id().to_string(),
                                outcome: AttemptOutcome::Success,
                                latency_ms,
                            });
                            info!(
                                model = model.id(),
                                label = %guess.label,
                                attempts = attempts.len(),
                                "[Recognition] Item recognized"
                            );
                            return Ok((guess, attempts));
                        }
                        Err(err) => {
                            warn!(model = model.id(), %err, "[Recognition] Unparseable response, falling back");
                            attempts.push(ModelAttempt {
                                model_id: model.id().to_string(),
                                outcome: err.outcome(),
                                latency_ms,
                            });
                            break;
                        }
                    },
                    Err(err) => {
                        attempts.push(ModelAttempt {
                            model_id: model.id().to_string(),
                            outcome: err.outcome(),
                            latency_ms,
                        });
                        if err.is_retryable() && retries_left > 0 {
                            debug!(
                                model = model.id(),
                                retries_left,
                                "[Recognition] Transport error, retrying same model"
                            );
                            retries_left -= 1;
                            tokio::time::sleep(backoff).await;
                            backoff *= 2;
                            continue;
                        }
                        warn!(model = model.id(), %err, "[Recognition] Candidate failed, falling back");
                        break;
                    }
                }
            }
        }

        warn!(
            attempts = attempts.len(),
            "[Recognition] All candidates exhausted"
        );
        Err(PipelineError::NoModelAvailable { attempts })
    }
}

fn build_prompt(hint: Option<&str>) -> String {
    match hint {
        Some(hint) if !hint.trim().is_empty() => {
            format!("{RECOGNITION_PROMPT}\nThe user describes it as: {}", hint.trim())
        }
        _ => RECOGNITION_PROMPT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::providers::MockVisionModel;
    use crate::selector::{ModelRegistry, ModelSelector};
    use shelfscan_core::VisionModel;

    fn policy_for_tests() -> RecognitionPolicy {
        RecognitionPolicy {
            attempt_timeout: Duration::from_secs(5),
            max_transport_retries: 2,
            retry_backoff: Duration::from_millis(1),
            max_image_bytes: 1024,
        }
    }

    fn orchestrator_for(models: Vec<Arc<MockVisionModel>>) -> Orchestrator {
        let mut registry = ModelRegistry::new();
        let ids: Vec<String> = models.iter().map(|m| m.id().to_string()).collect();
        for model in models {
            registry.register(model);
        }
        let selector = ModelSelector::from_registry(&registry, &ids).unwrap();
        Orchestrator::new(selector, policy_for_tests())
    }

    #[tokio::test]
    async fn single_succeeding_model_yields_nonempty_label() {
        let model = Arc::new(MockVisionModel::new("only").with_response("Chair"));
        let orchestrator = orchestrator_for(vec![model]);
        let (guess, attempts) = orchestrator.recognize(&[1, 2, 3], "image/png", None).await.unwrap();
        assert!(!guess.label.is_empty());
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].outcome, AttemptOutcome::Success);
    }

    #[tokio::test]
    async fn fallback_order_is_deterministic() {
        // A safety-blocked, B succeeds: A tried before B, C never touched.
        let a = Arc::new(MockVisionModel::new("a").with_safety_block());
        let b = Arc::new(MockVisionModel::new("b").with_response("Mug"));
        let c = Arc::new(MockVisionModel::new("c").with_response("Lamp"));
        let orchestrator = orchestrator_for(vec![a.clone(), b.clone(), c.clone()]);

        let (guess, attempts) = orchestrator.recognize(&[0u8; 4], "image/jpeg", None).await.unwrap();
        assert_eq!(guess.label, "Mug");

        let sequence: Vec<(&str, AttemptOutcome)> = attempts
            .iter()
            .map(|att| (att.model_id.as_str(), att.outcome))
            .collect();
        assert_eq!(
            sequence,
            vec![("a", AttemptOutcome::SafetyBlocked), ("b", AttemptOutcome::Success)]
        );
        assert_eq!(c.calls(), 0);
    }

    #[tokio::test]
    async fn transport_errors_exhaust_to_no_model_available() {
        let a = Arc::new(MockVisionModel::new("a").always_transport_error());
        let b = Arc::new(MockVisionModel::new("b").always_transport_error());
        let orchestrator = orchestrator_for(vec![a.clone(), b.clone()]);

        let err = orchestrator.recognize(&[0u8; 4], "image/png", None).await.unwrap_err();
        match err {
            PipelineError::NoModelAvailable { attempts } => {
                // 1 initial + 2 retries per model.
                assert_eq!(attempts.len(), 6);
                assert!(attempts.iter().all(|a| a.outcome == AttemptOutcome::TransportError));
            }
            other => panic!("expected NoModelAvailable, got {other:?}"),
        }
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 3);
    }

    #[tokio::test]
    async fn transport_error_retries_then_recovers_on_same_model() {
        let model = Arc::new(
            MockVisionModel::new("flaky")
                .then_transport_error()
                .then_response("Bottle"),
        );
        let orchestrator = orchestrator_for(vec![model.clone()]);

        let (guess, attempts) = orchestrator.recognize(&[0u8; 4], "image/png", None).await.unwrap();
        assert_eq!(guess.label, "Bottle");
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].outcome, AttemptOutcome::TransportError);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn quota_advances_without_same_model_retry() {
        let a = Arc::new(MockVisionModel::new("a").always_quota_exceeded());
        let b = Arc::new(MockVisionModel::new("b").with_response("Pen"));
        let orchestrator = orchestrator_for(vec![a.clone(), b]);

        let (_, attempts) = orchestrator.recognize(&[0u8; 4], "image/png", None).await.unwrap();
        assert_eq!(a.calls(), 1);
        assert_eq!(attempts[0].outcome, AttemptOutcome::QuotaExceeded);
    }

    #[tokio::test]
    async fn malformed_response_falls_back() {
        let a = Arc::new(MockVisionModel::new("a").with_response("   \n"));
        let b = Arc::new(MockVisionModel::new("b").with_response("Notebook"));
        let orchestrator = orchestrator_for(vec![a, b]);

        let (guess, attempts) = orchestrator.recognize(&[0u8; 4], "image/png", None).await.unwrap();
        assert_eq!(guess.label, "Notebook");
        assert_eq!(attempts[0].outcome, AttemptOutcome::Malformed);
    }

    #[tokio::test]
    async fn empty_image_is_rejected_before_any_call() {
        let model = Arc::new(MockVisionModel::new("only").with_response("Chair"));
        let orchestrator = orchestrator_for(vec![model.clone()]);

        let err = orchestrator.recognize(&[], "image/png", None).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn oversize_image_is_rejected_before_any_call() {
        let model = Arc::new(MockVisionModel::new("only").with_response("Chair"));
        let orchestrator = orchestrator_for(vec![model.clone()]);

        let image = vec![0u8; 2048]; // policy limit is 1024
        let err = orchestrator.recognize(&image, "image/png", None).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn hint_is_appended_to_prompt() {
        let prompt = build_prompt(Some("kitchen item"));
        assert!(prompt.contains("kitchen item"));
        assert_eq!(build_prompt(None), RECOGNITION_PROMPT);
        assert_eq!(build_prompt(Some("  ")), RECOGNITION_PROMPT);
    }
}
