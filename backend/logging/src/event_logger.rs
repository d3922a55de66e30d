//! Outcome Event Logger
//!
//! One structured record per delivered outcome, redacted before it reaches
//! any layer.

use serde_json::Value;
use tracing::{info, warn};
use verifier_core::{OutcomeReport, VerificationOutcome};

use crate::redact::{redact_tokens, REDACTED_CODE};

/// Log target for outcome records, so they can be filtered or routed separately.
pub const EVENT_TARGET: &str = "verification_events";

pub struct EventLogger;

impl EventLogger {
    /// Serialize `report` to JSON with the issued code masked and tokens
    /// scrubbed from free text. Ids and timestamps are left intact.
    pub fn render(report: &OutcomeReport) -> String {
        let mut value = match serde_json::to_value(report) {
            Ok(value) => value,
            Err(e) => return format!("{{\"unserializable\":\"{e}\"}}"),
        };
        if let Some(code) = value.pointer_mut("/outcome/code") {
            *code = Value::String(REDACTED_CODE.to_string());
        }
        redact_tokens(&value.to_string())
    }

    /// Emit `report` on [`EVENT_TARGET`]. Successes at info, everything else at warn.
    pub fn log_outcome(report: &OutcomeReport) {
        let entry = Self::render(report);
        let kind = report.outcome.kind();
        if matches!(
            report.outcome,
            VerificationOutcome::CodeIssued { .. } | VerificationOutcome::Matched { .. }
        ) {
            info!(target: EVENT_TARGET, requester = %report.requester, outcome = kind, event = %entry, "Verification outcome");
        } else {
            warn!(target: EVENT_TARGET, requester = %report.requester, outcome = kind, event = %entry, "Verification outcome");
        }
    }
}
