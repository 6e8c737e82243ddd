use thiserror::Error;

use crate::types::{AttemptOutcome, ModelAttempt};

/// Per-attempt failure classification for a single provider call.
///
/// `SafetyBlocked`, `QuotaExceeded`, and `Malformed` are never retried on
/// the same model; `Transport` gets a bounded number of same-model retries.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("safety filter blocked the request: {0}")]
    SafetyBlocked(String),

    #[error("provider quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unparseable provider output: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Map this failure onto the attempt-log outcome.
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::SafetyBlocked(_) => AttemptOutcome::SafetyBlocked,
            Self::QuotaExceeded(_) => AttemptOutcome::QuotaExceeded,
            Self::Transport(_) => AttemptOutcome::TransportError,
            Self::Malformed(_) => AttemptOutcome::Malformed,
        }
    }

    /// Whether a same-model retry can plausibly change the result.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Caller-facing error taxonomy for the ShelfScan pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected before any network call; user-correctable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every candidate (and its retries) failed; the attempt log carries
    /// the per-candidate reasons.
    #[error("no model available: {} candidate attempt(s) exhausted", .attempts.len())]
    NoModelAvailable { attempts: Vec<ModelAttempt> },

    /// Recognition could not produce a guess for a non-exhaustion reason.
    #[error("recognition failed: {0}")]
    RecognitionFailed(String),

    /// The persistence gateway rejected or lost the write. The ItemGuess is
    /// retained by the caller so reconciliation can be retried without
    /// re-running recognition.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        assert!(ProviderError::Transport("reset".into()).is_retryable());
        assert!(!ProviderError::SafetyBlocked("policy".into()).is_retryable());
        assert!(!ProviderError::QuotaExceeded("429".into()).is_retryable());
        assert!(!ProviderError::Malformed("empty".into()).is_retryable());
    }

    #[test]
    fn outcomes_match_variants() {
        assert_eq!(
            ProviderError::QuotaExceeded("429".into()).outcome(),
            AttemptOutcome::QuotaExceeded
        );
        assert_eq!(
            ProviderError::SafetyBlocked("policy".into()).outcome(),
            AttemptOutcome::SafetyBlocked
        );
    }
}
