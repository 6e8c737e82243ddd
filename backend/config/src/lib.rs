//! ShelfScan configuration: YAML schema with `${ENV_VAR}` substitution,
//! defaults, and validation.
//!
//! The pipeline consumes this surface but does not own it: provider
//! credentials stay in env vars referenced from the file, never inline.

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{
    InventoryConfig, LoggingConfig, ProviderCredential, ProvidersConfig, RecognitionConfig,
    ShelfScanConfig,
};
pub use validation::validate;
