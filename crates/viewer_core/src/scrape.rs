use std::collections::HashMap;

use regex::Regex;
use shared::{domain::ScrapedStrip, error::ScrapeError};

const MISSING_TITLE_PLACEHOLDER: &str = "N/A";

/// Structural extraction over semi-trusted page markup.
///
/// The page contract is narrow: one element whose class contains
/// `comic-item-container`, carrying the strip's metadata as `data-*`
/// attributes. Everything else on the page is ignored, and the
/// matching strategy stays behind this type so it can be swapped
/// without touching session logic.
pub struct StripScraper {
    container: Regex,
    attribute: Regex,
}

impl StripScraper {
    pub fn new() -> Self {
        Self {
            container: Regex::new(r#"<div[^>]*class="[^"]*comic-item-container[^>]*"#)
                .expect("valid container regex"),
            attribute: Regex::new(r#"data-([^=\s]+)="([^"]*)""#).expect("valid attribute regex"),
        }
    }

    /// Every `data-*` attribute present is captured; only `id`,
    /// `title` and `image` are consumed. The id is authoritative and
    /// has no fallback: without it the result cannot be cached or
    /// race-guarded.
    pub fn scrape(&self, html: &str) -> Result<ScrapedStrip, ScrapeError> {
        let container = self
            .container
            .find(html)
            .ok_or(ScrapeError::ContainerNotFound)?
            .as_str();

        let mut attributes = HashMap::new();
        for captures in self.attribute.captures_iter(container) {
            attributes.insert(captures[1].to_string(), decode_entities(&captures[2]));
        }

        let id = attributes.remove("id").ok_or(ScrapeError::MissingId)?;
        let title = attributes
            .remove("title")
            .unwrap_or_else(|| MISSING_TITLE_PLACEHOLDER.to_string());
        let image_url = attributes.remove("image").map(|raw| normalize_scheme(&raw));

        Ok(ScrapedStrip {
            id,
            title,
            image_url,
        })
    }
}

impl Default for StripScraper {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Protocol-relative artwork locators become explicit https URLs
/// before any fetch is attempted.
fn normalize_scheme(raw: &str) -> String {
    if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    }
}
