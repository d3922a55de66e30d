//! Verifier configuration schema, typed for serde YAML deserialization.
//!
//! Every field is optional on disk; [`crate::defaults`] fills the gaps and the
//! accessor methods below return effective values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    /// Pinned certificate authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<TrustConfig>,

    /// Profile site location and fetch limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileConfig>,

    /// Pending code lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,

    /// Concurrent profile checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<WorkersConfig>,

    /// Text shown to requesters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<MessagesConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustConfig {
    /// PEM or DER file holding exactly one CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// CSS selector for the bio region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Unset means codes never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_ttl_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesConfig {
    /// Where requesters edit their bio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_channel: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for daily-rolling JSON logs. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Effective values
// ---------------------------------------------------------------------------

impl VerifierConfig {
    pub fn ca_cert_path(&self) -> PathBuf {
        self.trust
            .as_ref()
            .and_then(|t| t.ca_cert_path.clone())
            .unwrap_or_else(defaults::default_ca_cert_path)
    }

    fn profile_cfg(&self) -> ProfileConfig {
        self.profile.clone().unwrap_or_default()
    }

    pub fn base_url(&self) -> String {
        self.profile_cfg()
            .base_url
            .unwrap_or_else(|| defaults::DEFAULT_BASE_URL.to_string())
    }

    pub fn bio_selector(&self) -> String {
        self.profile_cfg()
            .bio_selector
            .unwrap_or_else(|| defaults::DEFAULT_BIO_SELECTOR.to_string())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.profile_cfg()
                .connect_timeout_secs
                .unwrap_or(defaults::DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.profile_cfg()
                .request_timeout_secs
                .unwrap_or(defaults::DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Fetch knobs for the profile client.
    pub fn fetch_settings(&self) -> verifier_profile::FetchSettings {
        let profile = self.profile_cfg();
        let mut settings = verifier_profile::FetchSettings {
            base_url: self.base_url(),
            connect_timeout: self.connect_timeout(),
            request_timeout: self.request_timeout(),
            max_redirects: profile.max_redirects.unwrap_or(defaults::DEFAULT_MAX_REDIRECTS),
            max_body_bytes: profile.max_body_bytes.unwrap_or(defaults::DEFAULT_MAX_BODY_BYTES),
            ..Default::default()
        };
        if let Some(agent) = profile.user_agent {
            settings.user_agent = agent;
        }
        settings
    }

    pub fn code_ttl(&self) -> Option<Duration> {
        self.registry
            .as_ref()
            .and_then(|r| r.code_ttl_secs)
            .map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.registry
                .as_ref()
                .and_then(|r| r.sweep_interval_secs)
                .unwrap_or(defaults::DEFAULT_SWEEP_INTERVAL_SECS),
        )
    }

    pub fn pool_size(&self) -> usize {
        self.workers
            .as_ref()
            .and_then(|w| w.pool_size)
            .unwrap_or(defaults::DEFAULT_POOL_SIZE)
    }

    pub fn log_level(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| defaults::DEFAULT_LOG_LEVEL.to_string())
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.as_ref().and_then(|l| l.dir.clone())
    }

    pub fn message_settings(&self) -> verifier_core::MessageSettings {
        let mut settings = verifier_core::MessageSettings::default();
        if let Some(messages) = &self.messages {
            if let Some(url) = &messages.settings_url {
                settings.settings_url = url.clone();
            }
            settings.welcome_channel = messages.welcome_channel.clone();
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
trust:
  caCertPath: /etc/srs/cacert.pem
profile:
  baseUrl: https://example.com/citizens/
  requestTimeoutSecs: 15
registry:
  codeTtlSecs: 900
workers:
  poolSize: 4
messages:
  welcomeChannel: "1337"
"#;
        let cfg: VerifierConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.ca_cert_path(), PathBuf::from("/etc/srs/cacert.pem"));
        assert_eq!(cfg.base_url(), "https://example.com/citizens/");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.code_ttl(), Some(Duration::from_secs(900)));
        assert_eq!(cfg.pool_size(), 4);
        assert_eq!(cfg.message_settings().welcome_channel.as_deref(), Some("1337"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = VerifierConfig::default();
        assert_eq!(cfg.base_url(), defaults::DEFAULT_BASE_URL);
        assert_eq!(cfg.bio_selector(), defaults::DEFAULT_BIO_SELECTOR);
        assert_eq!(cfg.pool_size(), defaults::DEFAULT_POOL_SIZE);
        assert_eq!(cfg.code_ttl(), None);
        assert!(cfg.log_dir().is_none());
    }
}
