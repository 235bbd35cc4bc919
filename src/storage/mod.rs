//! Storage module for the page-state store
//!
//! This module owns every Page Record. Other components go through the
//! [`Storage`] trait's merge operations and queries; nothing caches a record
//! and writes it back.
//!
//! - SQLite schema and initialization
//! - Idempotent merge operations (insert, append sitemap/referrer, crawl result, indexability)
//! - Snapshot queries by URL and by domain substring

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeSet;

/// Durable state of one canonical URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub discovered_at: DateTime<Utc>,
    /// `None` until the first crawl result is recorded
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub status_code: Option<u16>,
    pub fetch_succeeded: bool,
    pub sitemaps: BTreeSet<String>,
    pub referring_pages: BTreeSet<String>,
    /// `None` means not yet evaluated against robots rules
    pub robots_index: Option<bool>,
    pub robots_follow: Option<bool>,
}

impl PageRecord {
    pub fn is_crawled(&self) -> bool {
        self.last_crawled_at.is_some()
    }

    /// No known referrer and not listed in any sitemap
    pub fn is_orphan(&self) -> bool {
        self.referring_pages.is_empty() && self.sitemaps.is_empty()
    }
}

/// Result of a discover/insert call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverOutcome {
    Inserted,
    AlreadyExists,
    RejectedNotAPage,
}

/// Result of a merge against an existing record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The record changed
    Applied,
    /// The value was already present
    Unchanged,
    /// No record for the URL; discover it first
    RecordNotFound,
}

/// Formats a timestamp for storage
///
/// Fixed width (microseconds, `Z` suffix) so that text ordering in SQLite is
/// chronological ordering.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
}
