use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

/// "A bio section containing a value container."
pub const DEFAULT_BIO_SELECTOR: &str = "div.bio div.value";

static DEFAULT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(DEFAULT_BIO_SELECTOR).unwrap());

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid bio selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Locates the bio region of a profile page.
#[derive(Debug, Clone)]
pub struct BioExtractor {
    selector: Selector,
}

impl BioExtractor {
    pub fn new(selector: &str) -> Result<Self, ExtractError> {
        let selector = Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { selector })
    }

    /// Trimmed text of the first matching element, or `None` when the page has
    /// no bio region.
    pub fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let element = document.select(&self.selector).next()?;
        let text = element.text().collect::<String>().trim().to_string();
        debug!(bio_len = text.len(), "Bio region found");
        Some(text)
    }
}

impl Default for BioExtractor {
    fn default() -> Self {
        Self {
            selector: DEFAULT_SELECTOR.clone(),
        }
    }
}

/// Extract with the default selector.
pub fn extract_bio(html: &str) -> Option<String> {
    BioExtractor::default().extract(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
        <html><body>
          <div class="profile-content">
            <div class="entry"><span class="label">Handle name</span><strong class="value">pilot</strong></div>
            <div class="entry bio">
              <span class="label">Bio</span>
              <div class="value">
                  Explorer. Verification: 482913
                  <br/>o7
              </div>
            </div>
          </div>
        </body></html>"#;

    #[test]
    fn extracts_trimmed_bio_text() {
        let bio = extract_bio(PROFILE).unwrap();
        assert!(bio.starts_with("Explorer. Verification: 482913"));
        assert!(bio.ends_with("o7"));
    }

    #[test]
    fn missing_bio_is_none() {
        let html = r#"<html><body><div class="entry"><div class="value">482913</div></div></body></html>"#;
        assert_eq!(extract_bio(html), None);
    }

    #[test]
    fn value_outside_bio_is_ignored() {
        let html = r#"<div class="value">outside</div><div class="bio"><p>no value here</p></div>"#;
        assert_eq!(extract_bio(html), None);
    }

    #[test]
    fn first_match_wins() {
        let html = r#"
            <div class="bio"><div class="value"> first </div></div>
            <div class="bio"><div class="value">second</div></div>"#;
        assert_eq!(extract_bio(html).as_deref(), Some("first"));
    }

    #[test]
    fn empty_region_is_present_but_empty() {
        let html = r#"<div class="bio"><div class="value">   </div></div>"#;
        assert_eq!(extract_bio(html).as_deref(), Some(""));
    }

    #[test]
    fn tolerates_broken_markup() {
        let html = r#"<div class="bio"><div class="value">123456<b>unclosed"#;
        assert_eq!(extract_bio(html).as_deref(), Some("123456unclosed"));
    }

    #[test]
    fn custom_selector() {
        let extractor = BioExtractor::new("section#about p").unwrap();
        let html = r#"<section id="about"><p> hello 111111 </p></section>"#;
        assert_eq!(extractor.extract(html).as_deref(), Some("hello 111111"));
    }

    #[test]
    fn invalid_selector_is_rejected() {
        let err = BioExtractor::new("div[").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidSelector { .. }));
    }
}
