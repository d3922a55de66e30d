//! Structured logging for the verifier.
//!
//! Handles subscriber setup, daily JSON file rotation, redaction of codes and
//! tokens, and outcome event records.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::EventLogger;
pub use logger::{init_logger, LOG_FILE_NAME};
pub use redact::{redact_code, redact_tokens, REDACTED_CODE};
