//! Log Redaction
//!
//! Scrubs verification codes and bot tokens from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

pub const REDACTED_CODE: &str = "[REDACTED_CODE]";

/// Discord-style bot tokens and bearer credentials.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_-]{23,28}\.[A-Za-z0-9_-]{6,7}\.[A-Za-z0-9_-]{27,})|(Bearer\s+[A-Za-z0-9\-\._~+/]+=*)")
        .unwrap()
});

/// Redacts bot and bearer tokens in a string.
pub fn redact_tokens(input: &str) -> String {
    TOKEN_RE.replace_all(input, "[REDACTED_TOKEN]").into_owned()
}

/// Redacts tokens and every occurrence of `code`, including inside longer
/// digit runs.
pub fn redact_code(input: &str, code: &str) -> String {
    let redacted = redact_tokens(input);
    if code.is_empty() {
        return redacted;
    }
    redacted.replace(code, REDACTED_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_the_given_code() {
        let clean = redact_code("bio: flying since 2950, code 482913.", "482913");
        assert_eq!(clean, "bio: flying since 2950, code [REDACTED_CODE].");
    }

    #[test]
    fn masks_code_inside_longer_digit_run() {
        let clean = redact_code("ref 4242424242", "424242");
        assert!(!clean.contains("424242"), "{clean}");
        assert!(clean.contains(REDACTED_CODE));
    }

    #[test]
    fn leaves_other_numbers() {
        let raw = "requester 123456 flew 654321 km";
        assert_eq!(redact_code(raw, "111111"), raw);
        assert_eq!(redact_tokens(raw), raw);
    }

    #[test]
    fn masks_tokens() {
        let raw = "token=MTIzNDU2Nzg5MDEyMzQ1Njc4OQ.GaBcDe.abcdefghijklmnopqrstuvwxyz0123 and Bearer eyJhbGciOiJIUzI1NiJ9";
        let clean = redact_tokens(raw);
        assert!(!clean.contains("GaBcDe"));
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiJ9"));
        assert_eq!(clean.matches("[REDACTED_TOKEN]").count(), 2);
    }
}
