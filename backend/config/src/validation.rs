//! Config validation: checks the effective values with user-friendly messages.

use crate::schema::VerifierConfig;
use std::time::Duration;
use thiserror::Error;
use verifier_profile::BioExtractor;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
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
pub fn validate(config: &VerifierConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_trust(config, &mut report);
    validate_profile(config, &mut report);
    validate_registry(config, &mut report);
    validate_workers(config, &mut report);
    validate_logging(config, &mut report);
    report
}

/// The anchor is loaded later; a missing file is only flagged here.
fn validate_trust(config: &VerifierConfig, report: &mut ValidationReport) {
    let path = config.ca_cert_path();
    if !path.exists() {
        report.warn(
            "trust.caCertPath",
            format!("CA certificate not found at {}; every profile fetch will fail", path.display()),
        );
    }
}

fn validate_profile(config: &VerifierConfig, report: &mut ValidationReport) {
    let base = config.base_url();
    if !base.starts_with("https://") {
        report.error("profile.baseUrl", format!("Profile base URL must use https, got '{base}'"));
    }

    if let Err(e) = BioExtractor::new(&config.bio_selector()) {
        report.error("profile.bioSelector", e.to_string());
    }

    for (path, timeout) in [
        ("profile.connectTimeoutSecs", config.connect_timeout()),
        ("profile.requestTimeoutSecs", config.request_timeout()),
    ] {
        if timeout.is_zero() {
            report.error(path, "Timeout must be > 0");
        }
    }

    let request = config.request_timeout();
    if !request.is_zero()
        && (request < Duration::from_secs(10) || request > Duration::from_secs(30))
    {
        report.warn(
            "profile.requestTimeoutSecs",
            format!("{}s is outside the usual 10-30s range", request.as_secs()),
        );
    }

    if let Some(profile) = &config.profile {
        if profile.max_body_bytes == Some(0) {
            report.error("profile.maxBodyBytes", "maxBodyBytes must be > 0");
        }
    }
}

fn validate_registry(config: &VerifierConfig, report: &mut ValidationReport) {
    if config.code_ttl() == Some(Duration::ZERO) {
        report.warn("registry.codeTtlSecs", "A TTL of 0 expires every code immediately");
    }
    if config.code_ttl().is_some() && config.sweep_interval().is_zero() {
        report.error("registry.sweepIntervalSecs", "sweepIntervalSecs must be > 0");
    }
}

fn validate_workers(config: &VerifierConfig, report: &mut ValidationReport) {
    if config.pool_size() == 0 {
        report.error("workers.poolSize", "poolSize must be >= 1");
    }
}

fn validate_logging(config: &VerifierConfig, report: &mut ValidationReport) {
    let level = config.log_level();
    if !matches!(
        level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    ) {
        report.error(
            "logging.level",
            format!("Unknown log level '{level}'. Use trace, debug, info, warn, error, or off"),
        );
    }
}
