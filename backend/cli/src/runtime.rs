//! Wiring shared by the commands: trust anchor, fetcher, extractor, coordinator.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use verifier_config::VerifierConfig;
use verifier_core::OutcomeSink;
use verifier_coordinator::VerificationCoordinator;
use verifier_profile::{BioExtractor, ProfileFetcher};
use verifier_security::{CodeRegistry, TrustStore};

/// Load the pinned anchor and build a fetcher on top of it.
///
/// A bad anchor is fatal: without it no profile can be fetched.
pub fn build_fetcher(config: &VerifierConfig) -> Result<ProfileFetcher> {
    let ca_path = config.ca_cert_path();
    let trust = TrustStore::from_path(&ca_path)
        .with_context(|| format!("Failed to load pinned CA from {}", ca_path.display()))?;
    let fetcher = ProfileFetcher::new(trust.client_config(), config.fetch_settings())
        .context("Failed to build profile fetcher")?;
    Ok(fetcher)
}

pub fn build_extractor(config: &VerifierConfig) -> Result<BioExtractor> {
    BioExtractor::new(&config.bio_selector()).context("Invalid bio selector")
}

pub fn build_coordinator(
    config: &VerifierConfig,
    sink: Arc<dyn OutcomeSink>,
) -> Result<VerificationCoordinator> {
    let fetcher = build_fetcher(config)?;
    let registry = Arc::new(CodeRegistry::with_ttl(config.code_ttl()));

    let coordinator = VerificationCoordinator::new(registry, Arc::new(fetcher), sink)
        .with_extractor(build_extractor(config)?)
        .with_pool_size(config.pool_size());

    info!(
        pool_size = config.pool_size(),
        code_ttl_secs = config.code_ttl().map(|d| d.as_secs()),
        base_url = %config.base_url(),
        "Verification coordinator ready"
    );
    Ok(coordinator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verifier_config::schema::{ProfileConfig, TrustConfig};
    use verifier_coordinator::LogSink;
    use verifier_security::testing::TestCa;

    fn config_with_ca(path: std::path::PathBuf) -> VerifierConfig {
        let mut config = VerifierConfig::default();
        config.trust = Some(TrustConfig { ca_cert_path: Some(path) });
        config
    }

    #[test]
    fn builds_from_pinned_ca_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cacert.pem");
        std::fs::write(&path, TestCa::new("Pinned CA").cert_pem()).unwrap();

        let coordinator = build_coordinator(&config_with_ca(path), Arc::new(LogSink)).unwrap();
        assert_eq!(coordinator.pool().size(), verifier_config::defaults::DEFAULT_POOL_SIZE);
    }

    #[test]
    fn missing_anchor_is_fatal_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_fetcher(&config_with_ca(dir.path().join("absent.pem"))).unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("Failed to load pinned CA"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn bad_selector_is_rejected() {
        let mut config = VerifierConfig::default();
        config.profile = Some(ProfileConfig { bio_selector: Some("div[".into()), ..Default::default() });
        assert!(build_extractor(&config).is_err());
    }
}
