use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::types::{ProfileName, RequesterId, VerificationCode};

/// Terminal result of one verify call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// A fresh code was issued and must be delivered to the requester.
    CodeIssued { code: VerificationCode },
    /// A profile was named but no code is pending for this requester.
    PendingNotFound,
    /// The supplied profile name failed validation; nothing was fetched.
    InvalidProfileName { reason: String },
    /// The profile page has no bio region.
    BioRegionMissing,
    /// The bio region does not contain the pending code.
    CodeMismatch,
    /// The fetch failed for a reason other than certificate trust.
    FetchFailed { cause: String },
    /// The server's certificate was not accepted by the pinned anchor.
    TrustFailed { cause: String },
    /// The task died unexpectedly; the pending code is untouched.
    Internal { cause: String },
    /// The bio contains the code; the pending entry was cleared.
    Matched { profile: ProfileName },
}

impl VerificationOutcome {
    /// Short machine name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CodeIssued { .. } => "code_issued",
            Self::PendingNotFound => "pending_not_found",
            Self::InvalidProfileName { .. } => "invalid_profile_name",
            Self::BioRegionMissing => "bio_region_missing",
            Self::CodeMismatch => "code_mismatch",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::TrustFailed { .. } => "trust_failed",
            Self::Internal { .. } => "internal",
            Self::Matched { .. } => "matched",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// Whether the requester can try again with the same pending code.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidProfileName { .. }
                | Self::BioRegionMissing
                | Self::CodeMismatch
                | Self::FetchFailed { .. }
                | Self::TrustFailed { .. }
                | Self::Internal { .. }
        )
    }
}

impl From<FetchError> for VerificationOutcome {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Trust(cause) => Self::TrustFailed { cause },
            other => Self::FetchFailed { cause: other.to_string() },
        }
    }
}

/// The event handed to the notification collaborator, exactly once per verify call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub requester: RequesterId,
    /// Raw profile name as supplied, if any.
    pub profile: Option<String>,
    pub outcome: VerificationOutcome,
    pub at: DateTime<Utc>,
}

impl OutcomeReport {
    pub fn new(requester: RequesterId, profile: Option<String>, outcome: VerificationOutcome) -> Self {
        Self {
            requester,
            profile,
            outcome,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_errors_map_to_trust_failed() {
        let outcome = VerificationOutcome::from(FetchError::Trust("UnknownIssuer".into()));
        assert_eq!(outcome, VerificationOutcome::TrustFailed { cause: "UnknownIssuer".into() });
    }

    #[test]
    fn other_fetch_errors_map_to_fetch_failed() {
        let outcome = VerificationOutcome::from(FetchError::Status(404));
        assert_eq!(outcome.kind(), "fetch_failed");
        assert!(outcome.is_retryable());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let code = VerificationCode::from_number(123_456).unwrap();
        let v = serde_json::to_value(VerificationOutcome::CodeIssued { code }).unwrap();
        assert_eq!(v["kind"], "code_issued");
        assert_eq!(v["code"], "123456");
    }

    #[test]
    fn pending_not_found_is_not_retryable() {
        assert!(!VerificationOutcome::PendingNotFound.is_retryable());
        assert!(!VerificationOutcome::PendingNotFound.is_success());
    }
}
