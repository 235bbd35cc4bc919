//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::retry::Transient;
use crate::robots::Indexability;
use crate::storage::{DiscoverOutcome, MergeOutcome, PageRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Transient for StorageError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page-store backends
///
/// Every mutation is idempotent and atomic per call, so a caller may re-issue
/// it after a failed or ambiguous attempt. URLs are expected in canonical form;
/// normalization happens before the store is reached.
pub trait Storage {
    // ===== Merge Operations =====

    /// Inserts a page record unless one already exists for the URL
    ///
    /// # Arguments
    ///
    /// * `url` - Canonical page URL
    /// * `referrer` - Page that linked to it, recorded only on insert
    ///
    /// # Returns
    ///
    /// `Inserted` or `AlreadyExists`; an existing record is left untouched
    fn insert_page(&mut self, url: &str, referrer: Option<&str>) -> StorageResult<DiscoverOutcome>;

    /// Adds a sitemap to the page's `sitemaps` set
    fn add_sitemap_reference(&mut self, url: &str, sitemap_url: &str)
        -> StorageResult<MergeOutcome>;

    /// Adds a referring page to the page's `referring_pages` set
    fn add_referrer(&mut self, url: &str, referrer_url: &str) -> StorageResult<MergeOutcome>;

    /// Overwrites the last crawl result, stamped with the current time
    fn record_crawl_result(
        &mut self,
        url: &str,
        status_code: Option<u16>,
        fetch_succeeded: bool,
    ) -> StorageResult<MergeOutcome> {
        self.record_crawl_result_at(url, status_code, fetch_succeeded, Utc::now())
    }

    /// Overwrites the last crawl result with an explicit crawl time
    fn record_crawl_result_at(
        &mut self,
        url: &str,
        status_code: Option<u16>,
        fetch_succeeded: bool,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<MergeOutcome>;

    /// Overwrites the robots index/follow flags
    fn set_indexability(&mut self, url: &str, flags: Indexability)
        -> StorageResult<MergeOutcome>;

    // ===== Queries =====

    /// Gets a page record by canonical URL
    fn get(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets every record whose URL contains `domain_filter` as a substring
    fn get_all(&self, domain_filter: &str) -> StorageResult<Vec<PageRecord>>;

    /// URLs containing `domain_filter` that were never crawled or were last
    /// crawled strictly before `cutoff`
    fn select_frontier(
        &self,
        domain_filter: &str,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<Vec<String>>;

    /// Counts records whose URL contains `domain_filter`
    fn count_pages(&self, domain_filter: &str) -> StorageResult<u64>;
}
