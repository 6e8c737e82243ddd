//! `${ENV_VAR}` substitution in config values, resolved at load time.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched, and `$${}` escapes
//! to a literal `${}`. Credentials therefore never live in the config file
//! itself, matching the "consumed, not owned" configuration contract.

use std::collections::HashMap;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

static ESCAPED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing or empty env vars.
#[derive(Debug, thiserror::Error)]
#[error("missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references throughout a config value tree.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    substitute_value(value, &std::env::vars().collect(), "")
}

/// Substitute using a provided map (useful for testing).
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => {
            let result: Result<Vec<_>> = items
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let full = caps.get(0).map(|m| (m.start(), m.as_str())).unwrap_or((0, ""));
        // Escaped reference ($${...}): leave it for the unescape pass.
        if full.0 > 0 && s.as_bytes().get(full.0 - 1) == Some(&b'$') {
            return full.1.to_string();
        }
        match env.get(&caps[1]) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert(MissingEnvVarError {
                    var_name: caps[1].to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }

    Ok(ESCAPED_PATTERN
        .replace_all(&substituted, |caps: &regex::Captures| {
            format!("${{{}}}", &caps[1])
        })
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_credential_reference() {
        let v = json!({"providers": {"gemini": {"apiKey": "${GEMINI_API_KEY}"}}});
        let resolved =
            resolve_env_vars_with(&v, &env(&[("GEMINI_API_KEY", "abc123")])).unwrap();
        assert_eq!(resolved["providers"]["gemini"]["apiKey"], "abc123");
    }

    #[test]
    fn missing_var_reports_config_path() {
        let v = json!({"providers": {"openai": {"apiKey": "${MISSING_KEY}"}}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("MISSING_KEY"));
        assert!(msg.contains("providers.openai.apiKey"));
    }

    #[test]
    fn empty_var_counts_as_missing() {
        let v = json!({"key": "${EMPTY_VAR}"});
        assert!(resolve_env_vars_with(&v, &env(&[("EMPTY_VAR", "")])).is_err());
    }

    #[test]
    fn escaped_reference_passes_through() {
        let v = json!({"note": "literal $${NOT_A_VAR} here"});
        let resolved = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(resolved["note"], "literal ${NOT_A_VAR} here");
    }

    #[test]
    fn plain_strings_pass_through() {
        let v = json!({"models": ["gemini-2.0-flash"]});
        let resolved = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(resolved, v);
    }
}
