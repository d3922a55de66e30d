//! Profile retrieval over a pinned TLS configuration and extraction of the
//! bio region from the returned HTML.

pub mod bio;
pub mod fetcher;

pub use bio::{extract_bio, BioExtractor, ExtractError, DEFAULT_BIO_SELECTOR};
pub use fetcher::{FetchSettings, ProfileFetcher, DEFAULT_PROFILE_BASE_URL};
