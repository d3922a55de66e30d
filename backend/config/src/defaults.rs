//! Config defaults: fills every unset field so the effective config can be
//! printed and validated as a whole.

use std::path::PathBuf;

use crate::schema::{
    LoggingConfig, MessagesConfig, ProfileConfig, RegistryConfig, TrustConfig, VerifierConfig,
    WorkersConfig,
};

pub use verifier_core::DEFAULT_SETTINGS_URL;
pub use verifier_profile::{DEFAULT_BIO_SELECTOR, DEFAULT_PROFILE_BASE_URL as DEFAULT_BASE_URL};

/// File name of the pinned CA inside the config directory.
pub const CA_CERT_FILE_NAME: &str = "cacert.pem";

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_REDIRECTS: usize = 3;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Concurrent profile checks.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// How often expired codes are swept when a TTL is set.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn default_ca_cert_path() -> PathBuf {
    crate::io::config_dir().join(CA_CERT_FILE_NAME)
}

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: VerifierConfig) -> VerifierConfig {
    let config = apply_trust_defaults(config);
    let config = apply_profile_defaults(config);
    let config = apply_registry_defaults(config);
    let config = apply_worker_defaults(config);
    let config = apply_message_defaults(config);
    apply_logging_defaults(config)
}

fn apply_trust_defaults(mut config: VerifierConfig) -> VerifierConfig {
    let trust = config.trust.get_or_insert_with(TrustConfig::default);
    if trust.ca_cert_path.is_none() {
        trust.ca_cert_path = Some(default_ca_cert_path());
    }
    config
}

fn apply_profile_defaults(mut config: VerifierConfig) -> VerifierConfig {
    let profile = config.profile.get_or_insert_with(ProfileConfig::default);
    profile.base_url.get_or_insert_with(|| DEFAULT_BASE_URL.to_string());
    profile.bio_selector.get_or_insert_with(|| DEFAULT_BIO_SELECTOR.to_string());
    profile.connect_timeout_secs.get_or_insert(DEFAULT_CONNECT_TIMEOUT_SECS);
    profile.request_timeout_secs.get_or_insert(DEFAULT_REQUEST_TIMEOUT_SECS);
    profile.max_redirects.get_or_insert(DEFAULT_MAX_REDIRECTS);
    profile.max_body_bytes.get_or_insert(DEFAULT_MAX_BODY_BYTES);
    config
}

/// The TTL stays unset unless configured; only the sweep interval is filled.
fn apply_registry_defaults(mut config: VerifierConfig) -> VerifierConfig {
    let registry = config.registry.get_or_insert_with(RegistryConfig::default);
    registry.sweep_interval_secs.get_or_insert(DEFAULT_SWEEP_INTERVAL_SECS);
    config
}

fn apply_worker_defaults(mut config: VerifierConfig) -> VerifierConfig {
    let workers = config.workers.get_or_insert_with(WorkersConfig::default);
    workers.pool_size.get_or_insert(DEFAULT_POOL_SIZE);
    config
}

fn apply_message_defaults(mut config: VerifierConfig) -> VerifierConfig {
    let messages = config.messages.get_or_insert_with(MessagesConfig::default);
    messages.settings_url.get_or_insert_with(|| DEFAULT_SETTINGS_URL.to_string());
    config
}

fn apply_logging_defaults(mut config: VerifierConfig) -> VerifierConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(VerifierConfig::default());
        let profile = cfg.profile.as_ref().unwrap();
        assert_eq!(profile.base_url.as_deref(), Some(DEFAULT_BASE_URL));
        assert_eq!(profile.max_redirects, Some(DEFAULT_MAX_REDIRECTS));
        assert_eq!(cfg.workers.as_ref().unwrap().pool_size, Some(DEFAULT_POOL_SIZE));
        assert!(cfg.trust.as_ref().unwrap().ca_cert_path.is_some());
        assert_eq!(cfg.registry.as_ref().unwrap().code_ttl_secs, None);
    }

    #[test]
    fn keeps_explicit_values() {
        let mut cfg = VerifierConfig::default();
        cfg.workers = Some(WorkersConfig { pool_size: Some(3) });
        cfg.profile = Some(ProfileConfig {
            bio_selector: Some("section.about".into()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.pool_size(), 3);
        assert_eq!(cfg.bio_selector(), "section.about");
        assert_eq!(cfg.request_timeout().as_secs(), DEFAULT_REQUEST_TIMEOUT_SECS);
    }
}
