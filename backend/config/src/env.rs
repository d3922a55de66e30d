//! Environment handling for config values.
//!
//! Two mechanisms, applied in order at load time:
//! - `${VAR_NAME}` substitution inside YAML string values. Only uppercase
//!   `[A-Z_][A-Z0-9_]*` names are matched; `$${VAR}` escapes to a literal `${VAR}`.
//! - `SRS_VERIFIER_*` overrides for individual fields of the typed config.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use crate::schema::{
    LoggingConfig, MessagesConfig, ProfileConfig, RegistryConfig, TrustConfig, VerifierConfig,
    WorkersConfig,
};

/// `${VAR}` or its escaped form `$${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

pub const ENV_CA_CERT: &str = "SRS_VERIFIER_CA_CERT";
pub const ENV_PROFILE_BASE_URL: &str = "SRS_VERIFIER_PROFILE_BASE_URL";
pub const ENV_POOL_SIZE: &str = "SRS_VERIFIER_POOL_SIZE";
pub const ENV_CODE_TTL_SECS: &str = "SRS_VERIFIER_CODE_TTL_SECS";
pub const ENV_LOG_LEVEL: &str = "SRS_VERIFIER_LOG_LEVEL";
pub const ENV_WELCOME_CHANNEL: &str = "SRS_VERIFIER_WELCOME_CHANNEL";

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a YAML value tree using the process env.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map (useful for testing).
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Sequence(seq) => seq
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut result = serde_yaml::Mapping::new();
            for (k, v) in map {
                let key = k.as_str().unwrap_or("?");
                let child_path = if path.is_empty() {
                    key.to_string()
                } else {
                    format!("{path}.{key}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Mapping(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply `SRS_VERIFIER_*` overrides from the process env.
pub fn apply_env_overrides(config: VerifierConfig) -> Result<VerifierConfig> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map. Empty values are ignored.
pub fn apply_env_overrides_with(
    mut config: VerifierConfig,
    env: &HashMap<String, String>,
) -> Result<VerifierConfig> {
    let get = |key: &str| env.get(key).map(String::as_str).filter(|v| !v.trim().is_empty());

    if let Some(path) = get(ENV_CA_CERT) {
        debug!(var = ENV_CA_CERT, "Config override from env");
        config.trust.get_or_insert_with(TrustConfig::default).ca_cert_path = Some(PathBuf::from(path));
    }
    if let Some(url) = get(ENV_PROFILE_BASE_URL) {
        debug!(var = ENV_PROFILE_BASE_URL, "Config override from env");
        config.profile.get_or_insert_with(ProfileConfig::default).base_url = Some(url.to_string());
    }
    if let Some(raw) = get(ENV_POOL_SIZE) {
        let size = raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{ENV_POOL_SIZE} must be a positive integer, got '{raw}'"))?;
        config.workers.get_or_insert_with(WorkersConfig::default).pool_size = Some(size);
    }
    if let Some(raw) = get(ENV_CODE_TTL_SECS) {
        let secs = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{ENV_CODE_TTL_SECS} must be a number of seconds, got '{raw}'"))?;
        config.registry.get_or_insert_with(RegistryConfig::default).code_ttl_secs = Some(secs);
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level.to_string());
    }
    if let Some(channel) = get(ENV_WELCOME_CHANNEL) {
        config.messages.get_or_insert_with(MessagesConfig::default).welcome_channel =
            Some(channel.to_string());
    }

    Ok(config)
}
