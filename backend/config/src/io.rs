//! Config file loading with env substitution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info};

use crate::env::resolve_env_vars;
use crate::schema::ShelfScanConfig;

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the ShelfScan config directory.
/// Priority: `SHELFSCAN_CONFIG_DIR` env > `~/.shelfscan/` > `.shelfscan`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SHELFSCAN_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".shelfscan");
    }
    PathBuf::from(".shelfscan")
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk, resolving `${ENV_VAR}` references.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run);
/// callers still apply defaults and validation afterwards.
pub async fn load_config(path: &Path) -> Result<ShelfScanConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(ShelfScanConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: serde_json::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    let resolved = resolve_env_vars(&value)
        .with_context(|| format!("Failed to resolve env vars in: {}", path.display()))?;

    let config: ShelfScanConfig = serde_json::from_value(resolved)
        .with_context(|| format!("Config did not match schema: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_default_config() {
        let config = load_config(Path::new("/nonexistent/shelfscan/config.yaml"))
            .await
            .unwrap();
        assert!(config.models.is_none());
    }

    #[tokio::test]
    async fn loads_yaml_with_env_substitution() {
        let dir = std::env::temp_dir().join(format!("shelfscan-io-test-{}", std::process::id()));
        fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        fs::write(
            &path,
            "models:\n  - gemini-2.0-flash\nproviders:\n  gemini:\n    apiKey: ${SHELFSCAN_TEST_KEY}\n",
        )
        .await
        .unwrap();

        std::env::set_var("SHELFSCAN_TEST_KEY", "k-123");
        let config = load_config(&path).await.unwrap();
        let _ = fs::remove_dir_all(&dir).await;

        assert_eq!(
            config.providers.unwrap().gemini.unwrap().api_key,
            "k-123"
        );
        assert_eq!(config.models.unwrap(), vec!["gemini-2.0-flash"]);
    }
}
