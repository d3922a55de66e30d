/// Profile fetcher: one HTTPS GET per attempt over the pinned TLS config.
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client};
use rustls::ClientConfig;
use tracing::{debug, warn};
use url::Url;
use verifier_core::{FetchError, ProfileName, ProfileSource};

pub const DEFAULT_PROFILE_BASE_URL: &str = "https://robertsspaceindustries.com/en/citizens/";
const DEFAULT_USER_AGENT: &str = concat!("srs-verifier/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MAX_REDIRECTS: usize = 3;
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Knobs for [`ProfileFetcher`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Profile names are appended to this URL.
    pub base_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Whole-request bound: connect, handshake, and body read.
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug)]
pub struct ProfileFetcher {
    client: Client,
    base_url: Url,
    max_body_bytes: usize,
}

impl ProfileFetcher {
    /// Build a fetcher whose client trusts only what `tls` trusts.
    pub fn new(tls: Arc<ClientConfig>, settings: FetchSettings) -> Result<Self, FetchError> {
        let base_url = parse_base_url(&settings.base_url)?;

        let redirects = match settings.max_redirects {
            0 => redirect::Policy::none(),
            n => redirect::Policy::limited(n),
        };

        let client = Client::builder()
            .use_preconfigured_tls(ClientConfig::clone(&tls))
            .https_only(true)
            .user_agent(settings.user_agent)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(redirects)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            max_body_bytes: settings.max_body_bytes,
        })
    }

    /// `base_url` + `profile`. The name is already restricted to URL-safe characters.
    pub fn profile_url(&self, profile: &ProfileName) -> Result<Url, FetchError> {
        self.base_url
            .join(profile.as_str())
            .map_err(|e| FetchError::InvalidUrl(format!("{}{profile}: {e}", self.base_url)))
    }

    /// GET `url` and return the body of a 2xx response.
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching profile");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Profile fetch returned error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(FetchError::BodyTooLarge { limit: self.max_body_bytes });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(FetchError::BodyTooLarge { limit: self.max_body_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, bytes = body.len(), "Profile fetched");
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl ProfileSource for ProfileFetcher {
    async fn fetch_profile(&self, profile: &ProfileName) -> Result<String, FetchError> {
        let url = self.profile_url(profile)?;
        self.fetch(&url).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.scheme() != "https" {
        return Err(FetchError::InvalidUrl(format!("{raw}: profile base must be https")));
    }
    if url.cannot_be_a_base() {
        return Err(FetchError::InvalidUrl(format!("{raw}: not a base URL")));
    }
    // Url::join replaces the last segment unless the path ends with '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Map a transport error onto the fetch taxonomy, separating certificate
/// rejections from other failures.
fn classify(err: reqwest::Error) -> FetchError {
    if let Some(cause) = certificate_rejection(&err) {
        return FetchError::Trust(cause);
    }
    if err.is_timeout() {
        return FetchError::Timeout;
    }
    if let Some(status) = err.status() {
        return FetchError::Status(status.as_u16());
    }
    FetchError::Network(error_chain(&err))
}

fn certificate_rejection(err: &(dyn StdError + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(tls) = find_tls_error(e) {
            return Some(tls.to_string());
        }
        current = e.source();
    }

    // Only reached if the wrapper chain changes shape in a dependency update.
    let chain = error_chain(err);
    if chain.contains("invalid peer certificate") {
        warn!(error = %chain, "Certificate rejection recognized by message text only");
        return Some(chain);
    }
    None
}

/// Look through one link of the source chain for a rustls certificate error.
///
/// tokio-rustls wraps the `rustls::Error` in an `io::Error`, and the HTTPS
/// connector wraps that in another `io::Error`. `io::Error::source` skips the
/// wrapped value, so custom payloads are opened with `get_ref` at every level.
fn find_tls_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a rustls::Error> {
    if let Some(tls) = err.downcast_ref::<rustls::Error>() {
        return is_certificate_error(tls).then_some(tls);
    }
    let io = err.downcast_ref::<std::io::Error>()?;
    let inner: &(dyn StdError + 'static) = io.get_ref()?;
    find_tls_error(inner)
}

fn is_certificate_error(err: &rustls::Error) -> bool {
    matches!(
        err,
        rustls::Error::InvalidCertificate(_) | rustls::Error::NoCertificatesPresented
    )
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        let text = e.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        current = e.source();
    }
    parts.join(": ")
}
