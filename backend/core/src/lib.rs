//! ShelfScan core: shared types, the error taxonomy, and the vision
//! provider seam used by the recognition and inventory crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{PipelineError, ProviderError};
pub use traits::{VisionModel, VisionRequest, VisionResponse};
pub use types::{AttemptOutcome, InventoryRecord, ItemGuess, ModelAttempt};
