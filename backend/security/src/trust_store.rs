//! Pinned trust anchor for outbound profile fetches.
//!
//! Loads exactly one CA certificate and builds a rustls client configuration
//! whose root store contains only that certificate. Platform roots are never
//! consulted, so any chain not terminating at the anchor fails the handshake.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use rustls::{ClientConfig, RootCertStore};
use thiserror::Error;
use tracing::{debug, info};

const PEM_ARMOR: &[u8] = b"-----BEGIN ";

/// Failure to load the pinned anchor. Fatal for every fetch until fixed.
#[derive(Debug, Error)]
pub enum TrustLoadError {
    #[error("trust anchor not found at {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read trust anchor at {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("trust anchor contains no certificate")]
    NoCertificate,

    #[error("trust anchor must be a single certificate, found {0}")]
    MultipleCertificates(usize),

    #[error("malformed trust anchor: {0}")]
    Malformed(String),

    #[error("TLS client configuration error: {0}")]
    Config(String),
}

/// A single pinned certificate authority and the client config built from it.
#[derive(Debug, Clone)]
pub struct TrustStore {
    anchor: CertificateDer<'static>,
    client_config: Arc<ClientConfig>,
}

impl TrustStore {
    /// Load the anchor from a PEM or DER file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TrustLoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TrustLoadError::Missing { path: path.to_path_buf() },
            _ => TrustLoadError::Unreadable { path: path.to_path_buf(), source },
        })?;
        let store = Self::from_bytes(&bytes)?;
        info!(path = %path.display(), "Loaded pinned trust anchor");
        Ok(store)
    }

    /// Load the anchor from PEM or DER bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrustLoadError> {
        let anchor = parse_anchor(bytes)?;

        let mut roots = RootCertStore::empty();
        roots
            .add(anchor.clone())
            .map_err(|e| TrustLoadError::Malformed(format!("not a usable CA certificate: {e}")))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let client_config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| TrustLoadError::Config(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        debug!(anchor_len = anchor.len(), "Built pinned TLS client config");
        Ok(Self {
            anchor,
            client_config: Arc::new(client_config),
        })
    }

    /// The shared, immutable client configuration.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// DER bytes of the pinned anchor.
    pub fn anchor(&self) -> &CertificateDer<'static> {
        &self.anchor
    }
}

fn parse_anchor(bytes: &[u8]) -> Result<CertificateDer<'static>, TrustLoadError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(TrustLoadError::NoCertificate);
    }

    if !bytes.windows(PEM_ARMOR.len()).any(|w| w == PEM_ARMOR) {
        // No armor: treat the whole file as one DER certificate.
        return Ok(CertificateDer::from(bytes.to_vec()));
    }

    let mut certs = CertificateDer::pem_slice_iter(bytes)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TrustLoadError::Malformed(format!("failed to parse PEM: {e}")))?;

    match certs.len() {
        0 => Err(TrustLoadError::NoCertificate),
        1 => Ok(certs.remove(0)),
        n => Err(TrustLoadError::MultipleCertificates(n)),
    }
}
