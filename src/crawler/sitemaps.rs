//! Sitemap document parsing
//!
//! Streams a sitemap or sitemap index with the `sitemap` crate's reader and
//! splits its entries into page locations and nested sitemap locations.

use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::io::Cursor;

/// Entries of one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `<url><loc>` entries
    pub urls: Vec<String>,

    /// `<sitemap><loc>` entries of a sitemap index
    pub sitemaps: Vec<String>,
}

/// Parses sitemap XML
///
/// Entries without a valid `<loc>` are skipped; malformed XML yields whatever
/// was read before the error.
pub fn parse_sitemap(xml: &[u8]) -> SitemapDocument {
    let mut document = SitemapDocument::default();

    for entity in SiteMapReader::new(Cursor::new(xml)) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    document.urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    document.sitemaps.push(url.to_string());
                }
            }
            _ => tracing::debug!("Skipping malformed sitemap entry"),
        }
    }

    document
}
