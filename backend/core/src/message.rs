//! Human-readable text for each outcome, as the chat layer would send it.

use serde::{Deserialize, Serialize};

use crate::event::VerificationOutcome;

/// Where requesters edit their profile bio.
pub const DEFAULT_SETTINGS_URL: &str = "https://robertsspaceindustries.com/en/account/profile";

/// Deployment-specific values interpolated into user messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSettings {
    pub settings_url: String,
    /// Channel id to point newly verified members at, if any.
    pub welcome_channel: Option<String>,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            settings_url: DEFAULT_SETTINGS_URL.to_string(),
            welcome_channel: None,
        }
    }
}

/// Render the message for `outcome`.
pub fn render(outcome: &VerificationOutcome, settings: &MessageSettings) -> String {
    match outcome {
        VerificationOutcome::CodeIssued { code } => format!(
            "Put the code below into the short bio field of your profile ({}), then run \
             `/verify <your handle>` to finish.\n\n`{code}`",
            settings.settings_url
        ),
        VerificationOutcome::PendingNotFound => {
            "Start verification by running `/verify` without a handle first.".to_string()
        }
        VerificationOutcome::InvalidProfileName { reason } => {
            format!("That handle can't be checked: {reason}.")
        }
        VerificationOutcome::BioRegionMissing => {
            "Could not find the bio section on your profile. Make sure the profile is public."
                .to_string()
        }
        VerificationOutcome::CodeMismatch => {
            "Code not found in your profile bio. Please double-check and try again.".to_string()
        }
        VerificationOutcome::FetchFailed { cause } => {
            format!("Error checking your profile: {cause}. Please try again shortly.")
        }
        VerificationOutcome::TrustFailed { cause } => {
            format!("Could not establish a trusted connection to the profile site: {cause}.")
        }
        VerificationOutcome::Internal { .. } => {
            "Something went wrong while checking your profile. Please try again.".to_string()
        }
        VerificationOutcome::Matched { profile } => {
            let mut text = format!(
                "You have been verified as {profile}. You can remove the code from your bio now."
            );
            if let Some(channel) = &settings.welcome_channel {
                text.push_str(&format!("\n\nHead to <#{channel}> to get chatting!"));
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProfileName, VerificationCode};

    #[test]
    fn issued_message_contains_code_and_url() {
        let code = VerificationCode::from_number(654_321).unwrap();
        let text = render(&VerificationOutcome::CodeIssued { code }, &MessageSettings::default());
        assert!(text.contains("`654321`"));
        assert!(text.contains(DEFAULT_SETTINGS_URL));
    }

    #[test]
    fn matched_mentions_welcome_channel_when_set() {
        let outcome = VerificationOutcome::Matched { profile: ProfileName::parse("pilot").unwrap() };
        let plain = render(&outcome, &MessageSettings::default());
        assert!(plain.contains("pilot"));
        assert!(!plain.contains("<#"));

        let settings = MessageSettings {
            welcome_channel: Some("1337".into()),
            ..Default::default()
        };
        assert!(render(&outcome, &settings).contains("<#1337>"));
    }
}
