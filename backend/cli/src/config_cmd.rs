//! `config`: print the effective config and its validation report.

use std::path::Path;

use anyhow::Result;
use verifier_config::{ValidationReport, VerifierConfig};

pub fn run(config: &VerifierConfig, report: &ValidationReport, source: &Path) -> Result<()> {
    println!("# source: {}", source.display());
    print!("{}", serde_yaml::to_string(config)?);

    for warning in &report.warnings {
        println!("# warning: {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("# error: {}: {}", error.path, error.message);
    }
    if report.is_valid() {
        println!("# config is valid");
    }
    Ok(())
}
