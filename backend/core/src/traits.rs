use async_trait::async_trait;

use crate::error::FetchError;
use crate::event::OutcomeReport;
use crate::types::ProfileName;

/// Source of raw profile HTML.
///
/// The production implementation performs a pinned-TLS HTTPS GET; tests
/// substitute canned pages.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the full HTML document for `profile`.
    async fn fetch_profile(&self, profile: &ProfileName) -> Result<String, FetchError>;
}

/// Receiver of verification outcomes (the chat/notification layer).
#[async_trait]
pub trait OutcomeSink: Send + Sync + 'static {
    async fn deliver(&self, report: OutcomeReport);
}
