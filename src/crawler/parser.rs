//! Listing-page parser for link harvesting
//!
//! This module handles parsing a search listing page to extract:
//! - The number of result anchors (the page's validation count)
//! - Detail links whose anchor text carries the marker word

use scraper::{Html, Selector};
use url::Url;

/// Result anchors inside the search result list
const LISTING_ANCHOR_SELECTOR: &str = "div.att-list > ul > li > div > div:nth-of-type(2) > h3 > a";

/// Extracted information from a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Result anchors found on the page, marked or not
    pub anchor_count: usize,

    /// Absolute detail links whose anchor text contains the marker
    pub links: Vec<String>,
}

/// Parses a listing page body
///
/// # Link Extraction Rules
///
/// **Include:**
/// - Result anchors whose text contains `marker`
///
/// **Exclude:**
/// - Anchors without an `href`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Non-HTTP(S) URLs after resolution
///
/// Every result anchor counts toward `anchor_count`, including excluded ones,
/// since the count validates the page layout rather than the links.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The listing URL, for resolving relative links
/// * `marker` - Word an anchor's text must contain to be harvested
pub fn parse_listing(html: &str, base_url: &Url, marker: &str) -> ListingPage {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse(LISTING_ANCHOR_SELECTOR) else {
        return ListingPage::default();
    };

    let mut page = ListingPage::default();
    for element in document.select(&selector) {
        page.anchor_count += 1;

        let text: String = element.text().collect();
        if !text.contains(marker) {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_link(href, base_url) {
                page.links.push(absolute_url);
            }
        }
    }

    page
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
