//! Recognition subsystem: turn (image, hint) into exactly one `ItemGuess`
//! or a terminal, diagnosable failure.
//!
//! The selector resolves the ordered candidate chain, the providers talk to
//! the vision APIs and classify their failures, the normalizer extracts a
//! label from unstructured provider prose, and the orchestrator drives the
//! whole fallback/retry policy.

pub mod normalizer;
pub mod orchestrator;
pub mod providers;
pub mod selector;

pub use normalizer::normalize_response;
pub use orchestrator::{Orchestrator, RecognitionPolicy};
pub use providers::{GeminiVisionModel, MockVisionModel, OpenAiVisionModel};
pub use selector::{ModelRegistry, ModelSelector};
