//! Vision provider adapters.
//!
//! Each adapter owns its failure classification: HTTP 429 becomes
//! `QuotaExceeded`, provider-flagged safety refusals become `SafetyBlocked`,
//! and everything network-shaped becomes `Transport`.

pub mod gemini;
pub mod mock;
pub mod openai;

pub use gemini::GeminiVisionModel;
pub use mock::MockVisionModel;
pub use openai::OpenAiVisionModel;
