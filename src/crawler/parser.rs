//! HTML link extraction
//!
//! Pulls same-host page links out of a fetched document so the crawl loop can
//! merge them into the store.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts the internal links of an HTML page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same page anchors)
/// - Links whose host differs from the page's host
///
/// Returned URLs are absolute, in document order, without duplicates. They are
/// not normalized.
///
/// # Example
///
/// ```
/// use crawl_ledger::crawler::extract_internal_links;
/// use url::Url;
///
/// let html = r#"<a href="/a">A</a><a href="https://other.org/">B</a>"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// assert_eq!(extract_internal_links(html, &page), vec!["https://example.com/a"]);
/// ```
pub fn extract_internal_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_link(href, page_url) else {
            continue;
        };
        if absolute.host_str() != page_url.host_str() {
            continue;
        }
        let absolute = absolute.to_string();
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }

    links
}

/// Resolves a link href against the page URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = page_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then_some(absolute)
}
