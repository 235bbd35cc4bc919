//! Crawler module for the crawl loop and its collaborators
//!
//! This module contains:
//! - The [`CrawlCollaborator`] seam through which the crawl loop reaches the network
//! - A default HTTP implementation (status fetch, link extraction, sitemaps, robots)
//! - The [`Coordinator`] that drives a run phase by phase

mod coordinator;
mod fetcher;
mod parser;
mod sitemaps;

pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{build_http_client, HttpCollaborator};
pub use parser::extract_internal_links;
pub use sitemaps::{parse_sitemap, SitemapDocument};

use crate::retry::Transient;
use crate::robots::RobotsRules;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Failure reported by a collaborator
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Timeout, connection failure or a server-side error; worth retrying
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Bad input or an unparseable document; retrying will not help
    #[error("invalid collaborator response: {0}")]
    Invalid(String),
}

impl Transient for CollaboratorError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Everything the crawl loop needs from the outside world
///
/// Implementations enforce their own timeouts.
#[async_trait]
pub trait CrawlCollaborator: Send + Sync {
    /// Status code of a GET on `url`, or `None` when no response was obtained
    async fn fetch_status(&self, url: &str) -> Result<Option<u16>, CollaboratorError>;

    /// Same-host links found on the page at `url`
    async fn extract_internal_links(&self, url: &str) -> Result<Vec<String>, CollaboratorError>;

    /// `(page_url, sitemap_url)` pairs for every page listed in the site's sitemaps
    async fn sitemap_urls(&self, base_url: &str)
        -> Result<Vec<(String, String)>, CollaboratorError>;

    /// Ordered robots rules for the site, or `None` when there are none to apply
    async fn fetch_robots_rules(
        &self,
        base_url: &str,
    ) -> Result<Option<RobotsRules>, CollaboratorError>;

    /// `Content-Type` reported for `url`
    async fn probe_content_type(&self, url: &str) -> Result<Option<String>, CollaboratorError>;
}

/// Phases of one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Init,
    DiscoverSeed,
    IngestSitemaps,
    CrawlLoop,
    ResolveIndexability,
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::DiscoverSeed => "discover-seed",
            Self::IngestSitemaps => "ingest-sitemaps",
            Self::CrawlLoop => "crawl-loop",
            Self::ResolveIndexability => "resolve-indexability",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
