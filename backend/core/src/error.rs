use thiserror::Error;

/// Failure of a single profile fetch attempt.
///
/// Every variant is terminal for that attempt. Callers retry by issuing a new
/// verify request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid profile url '{0}'")]
    InvalidUrl(String),

    /// The server's certificate chain did not validate against the pinned anchor.
    #[error("certificate rejected: {0}")]
    Trust(String),

    #[error("request timed out")]
    Timeout,

    #[error("profile server returned HTTP {0}")]
    Status(u16),

    #[error("profile body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    pub fn is_trust(&self) -> bool {
        matches!(self, FetchError::Trust(_))
    }
}

/// Reasons a caller-supplied profile name is refused before any URL is built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileNameError {
    #[error("profile name is empty")]
    Empty,

    #[error("profile name is longer than {max} characters")]
    TooLong { max: usize },

    #[error("profile name contains '{0}'; only letters, digits, '-' and '_' are allowed")]
    InvalidCharacter(char),
}
