//! Config validation: schema checks with field-path error messages.

use thiserror::Error;

use crate::schema::ShelfScanConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one validation pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
/// Expects defaults to have been applied already.
pub fn validate(config: &ShelfScanConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_models(config, &mut report);
    validate_providers(config, &mut report);
    validate_recognition(config, &mut report);
    validate_inventory(config, &mut report);
    report
}

fn validate_models(config: &ShelfScanConfig, report: &mut ValidationReport) {
    match &config.models {
        Some(models) if !models.is_empty() => {
            for (i, model) in models.iter().enumerate() {
                if model.trim().is_empty() {
                    report.error(format!("models[{i}]"), "Model id must not be empty");
                }
            }
        }
        _ => report.error("models", "At least one model candidate is required"),
    }
}

fn validate_providers(config: &ShelfScanConfig, report: &mut ValidationReport) {
    let Some(providers) = &config.providers else {
        report.warn(
            "providers",
            "No provider credentials configured; recognition calls will fail",
        );
        return;
    };
    if let Some(gemini) = &providers.gemini {
        if gemini.api_key.trim().is_empty() {
            report.error("providers.gemini.apiKey", "API key must not be empty");
        }
    }
    if let Some(openai) = &providers.openai {
        if openai.api_key.trim().is_empty() {
            report.error("providers.openai.apiKey", "API key must not be empty");
        }
    }
}

fn validate_recognition(config: &ShelfScanConfig, report: &mut ValidationReport) {
    let Some(recognition) = &config.recognition else { return };
    if recognition.attempt_timeout_ms == Some(0) {
        report.error("recognition.attemptTimeoutMs", "Timeout must be positive");
    }
    if recognition.max_image_bytes == Some(0) {
        report.error("recognition.maxImageBytes", "Image size limit must be positive");
    }
}

fn validate_inventory(config: &ShelfScanConfig, report: &mut ValidationReport) {
    let Some(inventory) = &config.inventory else { return };
    if let Some(backend) = &inventory.backend {
        if backend != "sqlite" && backend != "memory" {
            report.error(
                "inventory.backend",
                format!("Unknown backend {backend:?}; expected \"sqlite\" or \"memory\""),
            );
        }
    }
    if let Some(consistency) = &inventory.consistency {
        if consistency != "compare-and-swap" && consistency != "last-write-wins" {
            report.error(
                "inventory.consistency",
                format!(
                    "Unknown consistency mode {consistency:?}; expected \"compare-and-swap\" or \"last-write-wins\""
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{InventoryConfig, ProviderCredential, ProvidersConfig};

    #[test]
    fn defaulted_config_is_valid_with_provider_warning() {
        let config = apply_all_defaults(ShelfScanConfig::default());
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn empty_model_list_is_an_error() {
        let mut config = apply_all_defaults(ShelfScanConfig::default());
        config.models = Some(vec![]);
        assert!(!validate(&config).is_valid());
    }

    #[test]
    fn unknown_consistency_mode_is_an_error() {
        let mut config = apply_all_defaults(ShelfScanConfig::default());
        config.inventory = Some(InventoryConfig {
            consistency: Some("eventual".to_string()),
            ..Default::default()
        });
        let report = validate(&config);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "inventory.consistency");
    }

    #[test]
    fn blank_api_key_is_an_error() {
        let mut config = apply_all_defaults(ShelfScanConfig::default());
        config.providers = Some(ProvidersConfig {
            gemini: Some(ProviderCredential {
                api_key: "  ".to_string(),
                base_url: None,
            }),
            openai: None,
        });
        assert!(!validate(&config).is_valid());
    }
}
