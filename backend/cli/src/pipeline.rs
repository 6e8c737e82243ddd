//! The full user-action pipeline: upload → recognize → reconcile.
//!
//! Reconciliation retries are independent of recognition: a recognized
//! `ItemGuess` is cheap to retain, so storage trouble never forces another
//! provider call.

use std::time::Duration;

use tracing::warn;

use shelfscan_core::{InventoryRecord, ItemGuess, ModelAttempt, PipelineError};
use shelfscan_inventory::Reconciler;
use shelfscan_recognition::Orchestrator;

/// Reconciliation retries after the initial attempt.
const RECONCILE_RETRIES: u32 = 2;
const RECONCILE_BACKOFF: Duration = Duration::from_millis(250);

/// Result of one pipeline run. `record` is `None` exactly when
/// `storage_error` is `Some`: the guess survived, the write did not.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub guess: ItemGuess,
    pub attempts: Vec<ModelAttempt>,
    pub record: Option<InventoryRecord>,
    pub storage_error: Option<PipelineError>,
}

pub struct Pipeline {
    orchestrator: Orchestrator,
    reconciler: Reconciler,
}

impl Pipeline {
    pub fn new(orchestrator: Orchestrator, reconciler: Reconciler) -> Self {
        Self { orchestrator, reconciler }
    }

    /// Recognize the item once, then merge it into the inventory,
    /// retrying only the merge on storage trouble.
    pub async fn run(
        &self,
        image: &[u8],
        mime_type: &str,
        hint: Option<&str>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let (guess, attempts) = self.orchestrator.recognize(image, mime_type, hint).await?;

        let mut storage_error = None;
        for round in 0..=RECONCILE_RETRIES {
            match self.reconciler.reconcile(&guess).await {
                Ok(record) => {
                    return Ok(PipelineOutcome {
                        guess,
                        attempts,
                        record: Some(record),
                        storage_error: None,
                    })
                }
                Err(err @ PipelineError::StorageUnavailable(_)) => {
                    warn!(round, %err, "[Pipeline] Reconciliation failed, will retry");
                    storage_error = Some(err);
                    if round < RECONCILE_RETRIES {
                        tokio::time::sleep(RECONCILE_BACKOFF).await;
                    }
                }
                Err(other) => return Err(other),
            }
        }

        // The guess is handed back so the caller can replay reconciliation
        // later without re-running recognition.
        Ok(PipelineOutcome {
            guess,
            attempts,
            record: None,
            storage_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use shelfscan_core::VisionModel;
    use shelfscan_inventory::{InventoryStore, MemoryInventoryStore, StoreError};
    use shelfscan_recognition::{MockVisionModel, ModelRegistry, ModelSelector, RecognitionPolicy};

    fn orchestrator_for(models: Vec<Arc<MockVisionModel>>) -> Orchestrator {
        let mut registry = ModelRegistry::new();
        let ids: Vec<String> = models.iter().map(|m| m.id().to_string()).collect();
        for model in models {
            registry.register(model);
        }
        let selector = ModelSelector::from_registry(&registry, &ids).unwrap();
        let policy = RecognitionPolicy {
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        Orchestrator::new(selector, policy)
    }

    #[tokio::test]
    async fn red_mug_scenario_records_one_mug() {
        // Candidate list [modelX(SafetyBlocked), modelY(Success: "Mug")].
        let model_x = Arc::new(MockVisionModel::new("modelX").with_safety_block());
        let model_y = Arc::new(MockVisionModel::new("modelY").with_response("Mug"));
        let store = Arc::new(MemoryInventoryStore::new());
        let pipeline = Pipeline::new(
            orchestrator_for(vec![model_x, model_y]),
            Reconciler::new(store.clone()),
        );

        let outcome = pipeline
            .run(&[0xFF, 0xD8, 0xFF], "image/jpeg", Some("kitchen item"))
            .await
            .unwrap();

        let record = outcome.record.unwrap();
        assert_eq!(record.key, "mug");
        assert_eq!(record.quantity, 1);
        assert!(outcome.storage_error.is_none());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_candidates_write_nothing() {
        let a = Arc::new(MockVisionModel::new("a").always_transport_error());
        let b = Arc::new(MockVisionModel::new("b").always_transport_error());
        let store = Arc::new(MemoryInventoryStore::new());
        let pipeline = Pipeline::new(
            orchestrator_for(vec![a, b]),
            Reconciler::new(store.clone()),
        );

        let err = pipeline.run(&[1, 2, 3], "image/png", None).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoModelAvailable { .. }));
        assert!(store.list().await.unwrap().is_empty());
    }

    struct DownStore;

    #[async_trait]
    impl InventoryStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<InventoryRecord>, StoreError> {
            Err(StoreError::Unavailable("unreachable".to_string()))
        }
        async fn put(&self, _record: &InventoryRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("unreachable".to_string()))
        }
        async fn list(&self) -> Result<Vec<InventoryRecord>, StoreError> {
            Err(StoreError::Unavailable("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn storage_outage_retains_the_guess() {
        let model = Arc::new(MockVisionModel::new("only").with_response("Chair"));
        let pipeline = Pipeline::new(
            orchestrator_for(vec![model.clone()]),
            Reconciler::new(Arc::new(DownStore)),
        );

        let outcome = pipeline.run(&[1], "image/png", None).await.unwrap();
        assert_eq!(outcome.guess.label, "Chair");
        assert!(outcome.record.is_none());
        assert!(matches!(
            outcome.storage_error,
            Some(PipelineError::StorageUnavailable(_))
        ));
        // Recognition ran exactly once despite the storage retries.
        assert_eq!(model.calls(), 1);

        // The retained guess replays cleanly once storage recovers.
        let healthy = Reconciler::new(Arc::new(MemoryInventoryStore::new()));
        let record = healthy.reconcile(&outcome.guess).await.unwrap();
        assert_eq!(record.quantity, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_runs_only_between_reconcile_rounds() {
        let model = Arc::new(MockVisionModel::new("only").with_response("Lamp"));
        let pipeline = Pipeline::new(
            orchestrator_for(vec![model]),
            Reconciler::new(Arc::new(DownStore)),
        );

        let started = tokio::time::Instant::now();
        let outcome = pipeline.run(&[1], "image/png", None).await.unwrap();

        assert!(outcome.record.is_none());
        // Two gaps for three rounds; no sleep trails the final failure.
        assert_eq!(started.elapsed(), RECONCILE_BACKOFF * RECONCILE_RETRIES);
    }
}
