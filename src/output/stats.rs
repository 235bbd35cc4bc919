//! Per-domain statistics from the page store
//!
//! This module provides functionality for summarizing and displaying the
//! state of every page recorded under a domain filter.

use crate::storage::{PageRecord, Storage, StorageResult};

/// Page counts for one domain filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainStatistics {
    pub domain_filter: String,

    /// Total number of pages recorded
    pub total: usize,

    /// Pages with no recorded crawl
    pub never_crawled: usize,

    /// Last crawl produced a usable result
    pub succeeded: usize,

    /// Last crawl failed
    pub failed: usize,

    pub indexable: usize,
    pub non_indexable: usize,

    /// Robots flags not evaluated yet
    pub not_evaluated: usize,

    /// Listed in at least one sitemap
    pub in_sitemap: usize,

    /// No referrer and no sitemap
    pub orphans: usize,
}

impl DomainStatistics {
    pub fn from_pages(domain_filter: &str, pages: &[PageRecord]) -> Self {
        let mut stats = Self {
            domain_filter: domain_filter.to_string(),
            total: pages.len(),
            ..Self::default()
        };

        for page in pages {
            match (page.is_crawled(), page.fetch_succeeded) {
                (false, _) => stats.never_crawled += 1,
                (true, true) => stats.succeeded += 1,
                (true, false) => stats.failed += 1,
            }
            match page.robots_index {
                Some(true) => stats.indexable += 1,
                Some(false) => stats.non_indexable += 1,
                None => stats.not_evaluated += 1,
            }
            if !page.sitemaps.is_empty() {
                stats.in_sitemap += 1;
            }
            if page.is_orphan() {
                stats.orphans += 1;
            }
        }

        stats
    }
}

/// Loads statistics for every page whose URL contains `domain_filter`
pub fn load_statistics(
    storage: &dyn Storage,
    domain_filter: &str,
) -> StorageResult<DomainStatistics> {
    let pages = storage.get_all(domain_filter)?;
    Ok(DomainStatistics::from_pages(domain_filter, &pages))
}

fn percent(count: usize, total: usize) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DomainStatistics) {
    println!("=== Page Statistics: {} ===\n", stats.domain_filter);
    println!("  Total pages: {}", stats.total);
    println!();

    println!("Crawl state:");
    for (label, count) in [
        ("Never crawled", stats.never_crawled),
        ("Succeeded", stats.succeeded),
        ("Failed", stats.failed),
    ] {
        println!("  {}: {} ({:.1}%)", label, count, percent(count, stats.total));
    }
    println!();

    println!("Robots:");
    for (label, count) in [
        ("Indexable", stats.indexable),
        ("Not indexable", stats.non_indexable),
        ("Not evaluated", stats.not_evaluated),
    ] {
        println!("  {}: {} ({:.1}%)", label, count, percent(count, stats.total));
    }
    println!();

    println!("Provenance:");
    println!("  In a sitemap: {}", stats.in_sitemap);
    println!("  Orphans: {}", stats.orphans);
}
