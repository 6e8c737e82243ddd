use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured recognition output for one image submission.
///
/// Produced once per successful recognition call by the orchestrator and
/// immutable afterwards; the reconciler only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemGuess {
    /// Display label for the recognized item (e.g. "Red Mug").
    pub label: String,
    /// Model-reported confidence in [0, 1], if the provider gave one.
    pub confidence: Option<f32>,
    /// Full raw text returned by the provider, kept for auditing.
    pub raw_description: String,
    pub timestamp: DateTime<Utc>,
}

impl ItemGuess {
    pub fn new(label: impl Into<String>, raw_description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: None,
            raw_description: raw_description.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

/// Persisted aggregate count for one canonical item label.
///
/// Uniqueness invariant: at most one record per normalized key. Only the
/// reconciler mutates records; the core never deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Normalized label (lowercase, trimmed, whitespace-collapsed).
    pub key: String,
    pub quantity: u64,
    pub last_seen: DateTime<Utc>,
    /// Append-only sighting history.
    #[serde(default)]
    pub history: Vec<ItemGuess>,
}

impl InventoryRecord {
    /// Create a record for the first sighting of a key.
    pub fn first_sighting(key: impl Into<String>, guess: ItemGuess) -> Self {
        Self {
            key: key.into(),
            quantity: 1,
            last_seen: guess.timestamp,
            history: vec![guess],
        }
    }

    /// Fold a subsequent sighting into this record.
    pub fn record_sighting(&mut self, guess: ItemGuess) {
        self.quantity += 1;
        self.last_seen = guess.timestamp;
        self.history.push(guess);
    }
}

/// Classified result of one call to one model candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Success,
    SafetyBlocked,
    Malformed,
    TransportError,
    QuotaExceeded,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::SafetyBlocked => "safety-blocked",
            Self::Malformed => "malformed",
            Self::TransportError => "transport-error",
            Self::QuotaExceeded => "quota-exceeded",
        };
        f.write_str(s)
    }
}

/// Transient diagnostics for one model attempt. Never persisted; carried in
/// the attempt log so exhaustion failures stay diagnosable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAttempt {
    pub model_id: String,
    pub outcome: AttemptOutcome,
    pub latency_ms: u64,
}
