//! Config file loading.

use crate::schema::VerifierConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the verifier config directory.
/// Priority: `SRS_VERIFIER_CONFIG_DIR` env > `<local data dir>/SRSBot/Bot_Items`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SRS_VERIFIER_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::data_local_dir() {
        Some(base) => base.join("SRSBot").join("Bot_Items"),
        None => PathBuf::from(".srs-verifier"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run).
pub async fn load_config(path: &Path) -> Result<VerifierConfig> {
    let value = load_raw(path).await?;
    let config: VerifierConfig = serde_yaml::from_value(value)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    Ok(config)
}

/// Untyped YAML tree, so `${VAR}` references can be resolved before typing.
pub(crate) async fn load_raw(path: &Path) -> Result<serde_yaml::Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(serde_yaml::Value::Mapping(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses as null; treat it like a missing one.
    let value: serde_yaml::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    let value = match value {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
        other => other,
    };

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("config.yaml")).await.unwrap();
        assert!(cfg.workers.is_none());
    }

    #[tokio::test]
    async fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "").await.unwrap();
        let cfg = load_config(&path).await.unwrap();
        assert!(cfg.profile.is_none());
    }

    #[tokio::test]
    async fn loads_camel_case_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "workers:\n  poolSize: 7\n").await.unwrap();
        assert_eq!(load_config(&path).await.unwrap().pool_size(), 7);
    }

    #[tokio::test]
    async fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "workers: [unclosed").await.unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config YAML"));
    }
}
