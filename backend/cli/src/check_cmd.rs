//! `check`: one pinned fetch of a profile, extraction, and match against a
//! code supplied on the command line. Touches no registry state.

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::info;
use verifier_config::VerifierConfig;
use verifier_core::{ProfileName, ProfileSource, VerificationCode, VerificationOutcome};

use crate::runtime;

#[derive(Debug, Serialize)]
struct CheckResult {
    profile: String,
    outcome: VerificationOutcome,
    /// Bio text as found, when the region exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
}

/// Returns whether the code was found.
pub async fn run(config: &VerifierConfig, profile: &str, code: &str) -> Result<bool> {
    let Some(code) = VerificationCode::parse(code) else {
        bail!("'{code}' is not a six-digit verification code");
    };
    let profile = ProfileName::parse(profile)?;

    let fetcher = runtime::build_fetcher(config)?;
    let extractor = runtime::build_extractor(config)?;

    let (outcome, bio) = match fetcher.fetch_profile(&profile).await {
        Err(e) => (VerificationOutcome::from(e), None),
        Ok(html) => match extractor.extract(&html) {
            None => (VerificationOutcome::BioRegionMissing, None),
            Some(bio) if code.appears_in(&bio) => (
                VerificationOutcome::Matched { profile: profile.clone() },
                Some(bio),
            ),
            Some(bio) => (VerificationOutcome::CodeMismatch, Some(bio)),
        },
    };

    info!(profile = %profile, outcome = outcome.kind(), "Profile check finished");
    let matched = outcome.is_success();
    let result = CheckResult { profile: profile.to_string(), outcome, bio };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(matched)
}
