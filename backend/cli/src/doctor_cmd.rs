//! CLI Doctor Command
//!
//! Checks that the verifier can start: config validity, pinned anchor, and
//! fetcher construction.

use anyhow::Result;
use verifier_config::{ValidationReport, VerifierConfig};
use verifier_security::TrustStore;

use crate::runtime;

/// Executes the full doctor diagnosis. Returns whether every check passed.
pub async fn run(config: &VerifierConfig, report: &ValidationReport) -> Result<bool> {
    println!("\nRunning srs-verifier doctor...\n");

    let is_ok = check_config(report) & check_anchor(config) & check_fetcher(config);

    println!();
    if is_ok {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Fix the errors above.");
    }

    Ok(is_ok)
}

fn check_config(report: &ValidationReport) -> bool {
    println!("Config:");
    for warning in &report.warnings {
        println!("  [warn] {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("  [fail] {}: {}", error.path, error.message);
    }
    if report.is_valid() {
        println!("  [ok] no errors");
    }
    report.is_valid()
}

fn check_anchor(config: &VerifierConfig) -> bool {
    println!("Pinned CA:");
    let path = config.ca_cert_path();
    match TrustStore::from_path(&path) {
        Ok(store) => {
            println!("  [ok] {} ({} bytes DER)", path.display(), store.anchor().len());
            true
        }
        Err(e) => {
            println!("  [fail] {e}");
            false
        }
    }
}

fn check_fetcher(config: &VerifierConfig) -> bool {
    println!("Profile fetcher:");
    match runtime::build_fetcher(config).and_then(|_| runtime::build_extractor(config)) {
        Ok(_) => {
            println!("  [ok] {} with selector '{}'", config.base_url(), config.bio_selector());
            true
        }
        Err(e) => {
            println!("  [fail] {e:#}");
            false
        }
    }
}
