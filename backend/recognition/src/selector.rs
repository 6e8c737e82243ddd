//! Model registry and ordered candidate selection.
//!
//! Fallback is an ordered list, not a dispatch hierarchy: the registry maps
//! candidate ids to provider clients, and the selector freezes the
//! configured order so attempt sequencing stays deterministic and auditable.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use shelfscan_core::{PipelineError, VisionModel};

/// Registry of vision model candidates, looked up by id.
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn VisionModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under its own id.
    pub fn register(&mut self, model: Arc<dyn VisionModel>) {
        self.models.insert(model.id().to_string(), model);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn VisionModel>> {
        self.models.get(id).cloned()
    }
}

/// An ordered chain of model candidates to try, primary first.
pub struct ModelSelector {
    chain: Vec<Arc<dyn VisionModel>>,
}

impl std::fmt::Debug for ModelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSelector")
            .field("chain", &self.chain.iter().map(|m| m.id()).collect::<Vec<_>>())
            .finish()
    }
}

impl ModelSelector {
    /// Resolve a configured candidate list against the registry.
    ///
    /// Unknown ids are skipped with a warning; an empty resolved chain is a
    /// configuration error, surfaced before any network call is made.
    pub fn from_registry(registry: &ModelRegistry, candidates: &[String]) -> Result<Self, PipelineError> {
        let mut chain = Vec::with_capacity(candidates.len());
        for id in candidates {
            match registry.get(id) {
                Some(model) => chain.push(model),
                None => warn!("[Selector] Unknown model candidate {id:?}, skipping"),
            }
        }
        if chain.is_empty() {
            return Err(PipelineError::ConfigError(
                "no usable model candidates configured".to_string(),
            ));
        }
        Ok(Self { chain })
    }

    /// Candidates in configured order.
    pub fn candidates(&self) -> &[Arc<dyn VisionModel>] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockVisionModel;

    fn registry_with(ids: &[&str]) -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        for id in ids {
            registry.register(Arc::new(MockVisionModel::new(*id).with_response("Mug")));
        }
        registry
    }

    #[test]
    fn preserves_configured_order() {
        let registry = registry_with(&["a", "b", "c"]);
        let selector = ModelSelector::from_registry(
            &registry,
            &["c".to_string(), "a".to_string(), "b".to_string()],
        )
        .unwrap();
        let order: Vec<&str> = selector.candidates().iter().map(|m| m.id()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn skips_unknown_candidates() {
        let registry = registry_with(&["a"]);
        let selector = ModelSelector::from_registry(
            &registry,
            &["missing".to_string(), "a".to_string()],
        )
        .unwrap();
        assert_eq!(selector.len(), 1);
    }

    #[test]
    fn empty_chain_is_a_config_error() {
        let registry = registry_with(&[]);
        let err = ModelSelector::from_registry(&registry, &["x".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }
}
