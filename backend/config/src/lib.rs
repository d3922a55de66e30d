//! `verifier-config` — runtime configuration for the profile verifier.
//!
//! Provides:
//! - Typed config schema (trust anchor, profile site, registry, workers, messages, logging)
//! - YAML loading
//! - `${ENV_VAR}` substitution and `SRS_VERIFIER_*` overrides
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, apply_env_overrides_with, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::VerifierConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load, substitute env vars, apply overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// findings are returned rather than logged: the logger is configured from
/// this config, so the caller reports them once it is up and decides whether
/// errors are fatal.
pub async fn load_and_prepare(path: &Path) -> Result<(VerifierConfig, ValidationReport)> {
    let raw = io::load_raw(path).await?;

    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;

    let config: VerifierConfig = serde_yaml::from_value(value)
        .context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config)?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    Ok((config, report))
}
