use std::fmt;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProfileNameError;

/// Longest profile handle accepted for URL interpolation.
pub const MAX_PROFILE_NAME_LEN: usize = 60;

static PROFILE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Opaque identity of the person asking to be verified (a chat user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(pub u64);

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequesterId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A six-digit one-time code in `[100000, 999999]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub const MIN: u32 = 100_000;
    pub const MAX: u32 = 999_999;

    /// Builds a code from a number in range. Returns `None` outside `[MIN, MAX]`.
    pub fn from_number(n: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&n)
            .then(|| Self(format!("{n:06}")))
    }

    /// Draws a code uniformly from `[MIN, MAX]` using the thread-local CSPRNG.
    pub fn generate() -> Self {
        let n = rand::thread_rng().gen_range(Self::MIN..=Self::MAX);
        Self(format!("{n:06}"))
    }

    /// Parses a user-typed code, accepting only exactly six ASCII digits in range.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u32>().ok().and_then(Self::from_number)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring containment of this exact code within `text`.
    pub fn appears_in(&self, text: &str) -> bool {
        text.contains(self.0.as_str())
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated third-party profile handle, safe to append to a URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileName(String);

impl ProfileName {
    pub fn parse(raw: &str) -> Result<Self, ProfileNameError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ProfileNameError::Empty);
        }
        if name.chars().count() > MAX_PROFILE_NAME_LEN {
            return Err(ProfileNameError::TooLong { max: MAX_PROFILE_NAME_LEN });
        }
        if !PROFILE_NAME_RE.is_match(name) {
            let bad = name
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
                .unwrap_or('?');
            return Err(ProfileNameError::InvalidCharacter(bad));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProfileName {
    type Error = ProfileNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProfileName> for String {
    fn from(name: ProfileName) -> Self {
        name.0
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
