//! Crawler coordinator - main crawl orchestration logic
//!
//! A run walks through [`CrawlPhase`]s in order:
//! - Seed the store with the base URL
//! - Ingest every page listed in the site's sitemaps
//! - Repeatedly select the frontier and crawl each URL until it is empty
//! - Resolve robots indexability for every known page of the site
//!
//! Failures in a one-time step abort the run; failures inside the per-URL
//! crawl body are logged and the loop moves on.

use crate::config::Config;
use crate::crawler::{CrawlCollaborator, CrawlPhase, HttpCollaborator};
use crate::frontier;
use crate::retry::RetryPolicy;
use crate::robots::resolve_canonical;
use crate::storage::{DiscoverOutcome, MergeOutcome, PageRecord, SqliteStorage, Storage};
use crate::url::{is_page, normalize_url, same_host, url_path};
use crate::{LedgerError, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Totals for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Fetched with a status below 400 and expanded
    pub pages_crawled: usize,
    /// No status or a status of 400 and above
    pub pages_failed: usize,
    /// Abandoned after an exhausted retry budget; left in the frontier
    pub pages_skipped: usize,
    /// Links merged into the store from crawled pages
    pub links_merged: usize,
    /// New sitemap references recorded
    pub sitemap_refs: usize,
    /// Pages whose robots flags were evaluated
    pub indexability_resolved: usize,
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} crawled, {} failed, {} skipped, {} links merged, {} sitemap references, {} robots evaluations",
            self.pages_crawled,
            self.pages_failed,
            self.pages_skipped,
            self.links_merged,
            self.sitemap_refs,
            self.indexability_resolved
        )
    }
}

/// What happened to one URL in the crawl body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlOutcome {
    Crawled { links: usize },
    Failed,
}

/// Runs a synchronous store call from async code
///
/// Store writes may sleep between retry attempts. On a multi-threaded runtime
/// the worker hands its other tasks off before blocking.
fn blocking<T>(op: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(op)
        }
        _ => op(),
    }
}

fn fatal(phase: CrawlPhase, err: impl fmt::Display) -> LedgerError {
    tracing::error!("Fatal failure during {}: {}", phase, err);
    LedgerError::Fatal {
        phase,
        message: err.to_string(),
    }
}

/// Main crawler coordinator structure
///
/// Owns the page store and the collaborator for its whole lifetime; the store
/// is closed when the coordinator is dropped.
pub struct Coordinator<S: Storage, C: CrawlCollaborator> {
    store: S,
    collaborator: C,
    retry: RetryPolicy,
}

impl Coordinator<SqliteStorage, HttpCollaborator> {
    /// Opens the configured SQLite store and builds the HTTP collaborator
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to crawl
    /// * `Err(LedgerError::Fatal)` - The database could not be initialized
    /// * `Err(LedgerError::Http)` - The HTTP client could not be built
    pub fn open(config: &Config) -> Result<Self> {
        let retry = config.retry.policy();
        let store = SqliteStorage::open(
            Path::new(&config.store.database_path),
            &config.store,
            retry,
        )
        .map_err(|e| fatal(CrawlPhase::Init, e))?;
        let collaborator = HttpCollaborator::new(config)?;
        Ok(Self::new(store, collaborator, retry))
    }
}

impl<S: Storage, C: CrawlCollaborator> Coordinator<S, C> {
    pub fn new(store: S, collaborator: C, retry: RetryPolicy) -> Self {
        Self {
            store,
            collaborator,
            retry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    // ===== Runs =====

    /// Crawls a site until no URL under it is due
    ///
    /// # Arguments
    ///
    /// * `base_url` - Site root; its canonical form is the seed and the domain filter
    /// * `staleness_days` - Re-crawl window; `0` means anything not crawled today
    pub async fn crawl(&mut self, base_url: &str, staleness_days: u32) -> Result<CrawlReport> {
        enter(CrawlPhase::Init, base_url);
        let base = normalize_url(base_url).map_err(|e| fatal(CrawlPhase::Init, e))?;
        let mut report = CrawlReport::default();

        enter(CrawlPhase::DiscoverSeed, &base);
        match self.discover(&base, None).await {
            Ok(DiscoverOutcome::RejectedNotAPage) => {
                tracing::warn!("Seed {} is not an HTML page", base);
            }
            Ok(outcome) => tracing::debug!("Seed {}: {:?}", base, outcome),
            Err(e) => return Err(fatal(CrawlPhase::DiscoverSeed, e)),
        }

        enter(CrawlPhase::IngestSitemaps, &base);
        report.sitemap_refs = self.ingest_sitemaps(&base).await?;

        enter(CrawlPhase::CrawlLoop, &base);
        self.crawl_loop(&base, staleness_days, &mut report).await?;

        enter(CrawlPhase::ResolveIndexability, &base);
        report.indexability_resolved = self
            .resolve_indexability(&base)
            .await
            .map_err(|e| fatal(CrawlPhase::ResolveIndexability, e))?;

        enter(CrawlPhase::Done, &base);
        tracing::info!("Crawl of {} finished: {}", base, report);
        Ok(report)
    }

    /// Crawls a site, re-fetching everything not crawled today
    pub async fn recrawl(&mut self, base_url: &str) -> Result<CrawlReport> {
        self.crawl(base_url, 0).await
    }

    /// Runs one URL through the crawl body, outside frontier selection
    ///
    /// The URL is discovered first if the store does not know it yet. Errors
    /// are returned to the caller instead of being absorbed.
    pub async fn recrawl_single(&mut self, url: &str) -> Result<CrawlReport> {
        let canonical = normalize_url(url)?;
        let mut report = CrawlReport::default();

        if self.discover(&canonical, None).await? == DiscoverOutcome::RejectedNotAPage {
            tracing::warn!("{} is not an HTML page; nothing to crawl", canonical);
            report.pages_skipped = 1;
            return Ok(report);
        }

        match self.crawl_url(&canonical).await? {
            UrlOutcome::Crawled { links } => {
                report.pages_crawled = 1;
                report.links_merged = links;
            }
            UrlOutcome::Failed => report.pages_failed = 1,
        }
        Ok(report)
    }

    async fn ingest_sitemaps(&mut self, base: &str) -> Result<usize> {
        let pairs = self
            .retry
            .run_async(|| self.collaborator.sitemap_urls(base))
            .await
            .map_err(|e| fatal(CrawlPhase::IngestSitemaps, e))?;
        tracing::info!("{} sitemap entries for {}", pairs.len(), base);

        let mut recorded = 0;
        for (url, sitemap_url) in pairs {
            match self.ingest_sitemap_entry(&url, &sitemap_url).await {
                Ok(true) => recorded += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("Sitemap entry {} from {} not stored: {}", url, sitemap_url, e),
            }
        }
        Ok(recorded)
    }

    async fn ingest_sitemap_entry(&mut self, url: &str, sitemap_url: &str) -> Result<bool> {
        let Some(canonical) = self.admit(url).await else {
            return Ok(false);
        };
        let store = &mut self.store;
        let outcome = blocking(|| {
            store.insert_page(&canonical, None)?;
            store.add_sitemap_reference(&canonical, sitemap_url)
        })?;
        Ok(outcome == MergeOutcome::Applied)
    }

    async fn crawl_loop(
        &mut self,
        base: &str,
        staleness_days: u32,
        report: &mut CrawlReport,
    ) -> Result<()> {
        let mut attempted: HashSet<String> = HashSet::new();

        loop {
            let due = blocking(|| frontier::select(&self.store, base, staleness_days));
            let batch: Vec<String> = due
                .map_err(|e| fatal(CrawlPhase::CrawlLoop, e))?
                .into_iter()
                .filter(|url| !attempted.contains(url))
                .collect();
            if batch.is_empty() {
                tracing::info!("Frontier for {} is empty", base);
                return Ok(());
            }
            tracing::info!("Crawling batch of {} URLs", batch.len());

            for url in batch {
                attempted.insert(url.clone());
                match self.crawl_url(&url).await {
                    Ok(UrlOutcome::Crawled { links }) => {
                        report.pages_crawled += 1;
                        report.links_merged += links;
                    }
                    Ok(UrlOutcome::Failed) => report.pages_failed += 1,
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", url, e);
                        report.pages_skipped += 1;
                    }
                }
            }
        }
    }

    /// Crawl body for one canonical URL already in the store
    ///
    /// The crawl result is written last, after every discovered link has been
    /// merged. Every link is merged, including one back to `url` itself, which
    /// then lists the page among its own referrers.
    async fn crawl_url(&mut self, url: &str) -> Result<UrlOutcome> {
        let status = match self
            .retry
            .run_async(|| self.collaborator.fetch_status(url))
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("No status for {}: {}", url, e);
                None
            }
        };

        let status = match status {
            Some(code) if code < 400 => code,
            _ => {
                tracing::debug!("{} failed with status {:?}", url, status);
                blocking(|| self.store.record_crawl_result(url, status, false))?;
                return Ok(UrlOutcome::Failed);
            }
        };

        let links = self
            .retry
            .run_async(|| self.collaborator.extract_internal_links(url))
            .await?;

        let mut merged = 0;
        for link in links {
            let Some(canonical) = self.admit(&link).await else {
                continue;
            };
            let store = &mut self.store;
            let (discovered, referrer) = blocking(|| -> Result<_> {
                Ok((
                    store.insert_page(&canonical, Some(url))?,
                    store.add_referrer(&canonical, url)?,
                ))
            })?;
            tracing::debug!("{} -> {}: {:?}, {:?}", url, canonical, discovered, referrer);
            merged += 1;
        }

        blocking(|| self.store.record_crawl_result(url, Some(status), true))?;
        tracing::debug!("Crawled {} ({}), {} links", url, status, merged);
        Ok(UrlOutcome::Crawled { links: merged })
    }

    /// Sets robots flags on every stored page of the site
    ///
    /// Returns the number of pages evaluated. When the site has no robots rules,
    /// or they cannot be fetched, nothing is touched and `0` is returned.
    pub async fn resolve_indexability(&mut self, base_url: &str) -> Result<usize> {
        let base = normalize_url(base_url)?;
        let rules = match self
            .retry
            .run_async(|| self.collaborator.fetch_robots_rules(&base))
            .await
        {
            Ok(Some(rules)) => rules,
            Ok(None) => {
                tracing::info!("No robots rules for {}; indexability left as is", base);
                return Ok(0);
            }
            Err(e) => {
                tracing::warn!("Robots rules for {} unavailable: {}", base, e);
                return Ok(0);
            }
        };

        let mut resolved = 0;
        let pages = blocking(|| self.store.get_all(&base))?;
        for page in pages {
            if !same_host(&page.url, &base) {
                continue;
            }
            let Some(flags) =
                url_path(&page.url).and_then(|path| resolve_canonical(&path, Some(&rules)))
            else {
                continue;
            };
            match blocking(|| self.store.set_indexability(&page.url, flags)) {
                Ok(_) => resolved += 1,
                Err(e) => tracing::warn!("Indexability for {} not stored: {}", page.url, e),
            }
        }

        tracing::info!("Resolved indexability for {} pages of {}", resolved, base);
        Ok(resolved)
    }

    // ===== Merge Operations =====

    /// Normalizes, classifies and inserts a URL
    pub async fn discover(
        &mut self,
        raw_url: &str,
        referrer: Option<&str>,
    ) -> Result<DiscoverOutcome> {
        let Some(url) = self.admit(raw_url).await else {
            return Ok(DiscoverOutcome::RejectedNotAPage);
        };
        let referrer = referrer.map(canonical_or_raw);
        Ok(blocking(|| self.store.insert_page(&url, referrer.as_deref()))?)
    }

    pub fn add_sitemap_reference(&mut self, url: &str, sitemap_url: &str) -> Result<MergeOutcome> {
        let url = normalize_url(url)?;
        Ok(self.store.add_sitemap_reference(&url, sitemap_url)?)
    }

    pub fn add_referrer(&mut self, url: &str, referrer_url: &str) -> Result<MergeOutcome> {
        let url = normalize_url(url)?;
        let referrer = canonical_or_raw(referrer_url);
        Ok(self.store.add_referrer(&url, &referrer)?)
    }

    // ===== Queries =====

    pub fn get_page(&self, url: &str) -> Result<Option<PageRecord>> {
        let url = normalize_url(url)?;
        Ok(self.store.get(&url)?)
    }

    /// Every stored page whose URL contains the canonical base URL
    pub fn get_domain_pages(&self, base_url: &str) -> Result<Vec<PageRecord>> {
        let base = normalize_url(base_url)?;
        Ok(self.store.get_all(&base)?)
    }

    /// Canonical form of `raw_url` if it is a crawlable page
    async fn admit(&self, raw_url: &str) -> Option<String> {
        let url = match normalize_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Ignoring {}: {}", raw_url, e);
                return None;
            }
        };
        if is_page(&url, &self.collaborator, &self.retry).await {
            Some(url)
        } else {
            tracing::debug!("{} is not a page", url);
            None
        }
    }
}

fn enter(phase: CrawlPhase, base: &str) {
    tracing::info!("[{}] {}", phase, base);
}

fn canonical_or_raw(url: &str) -> String {
    normalize_url(url).unwrap_or_else(|_| url.to_string())
}
