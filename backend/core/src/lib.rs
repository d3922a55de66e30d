pub mod channel;
pub mod error;
pub mod event;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::{ChannelSink, OutcomeBus};
pub use error::{FetchError, ProfileNameError};
pub use event::{OutcomeReport, VerificationOutcome};
pub use message::{render, MessageSettings, DEFAULT_SETTINGS_URL};
pub use traits::{OutcomeSink, ProfileSource};
pub use types::{ProfileName, RequesterId, VerificationCode, MAX_PROFILE_NAME_LEN};
