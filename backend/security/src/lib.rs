pub mod code_registry;
pub mod trust_store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use code_registry::{CodeRegistry, PendingCode};
pub use trust_store::{TrustLoadError, TrustStore};
