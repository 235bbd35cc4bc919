//! Output module for CLI reports
//!
//! This module handles:
//! - Per-domain page statistics
//! - Printing single page records and page listings

pub mod stats;

pub use stats::{load_statistics, print_statistics, DomainStatistics};

use crate::storage::PageRecord;

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

/// Prints every field of a page record
pub fn print_page(page: &PageRecord) {
    println!("URL:             {}", page.url);
    println!("Discovered:      {}", page.discovered_at.to_rfc3339());
    match page.last_crawled_at {
        Some(at) => println!("Last crawled:    {}", at.to_rfc3339()),
        None => println!("Last crawled:    never"),
    }
    match page.status_code {
        Some(code) => println!("Status:          {}", code),
        None => println!("Status:          -"),
    }
    println!("Fetch succeeded: {}", page.fetch_succeeded);
    println!("Robots index:    {}", flag(page.robots_index));
    println!("Robots follow:   {}", flag(page.robots_follow));

    println!("Sitemaps ({}):", page.sitemaps.len());
    for sitemap in &page.sitemaps {
        println!("  - {}", sitemap);
    }
    println!("Referring pages ({}):", page.referring_pages.len());
    for referrer in &page.referring_pages {
        println!("  - {}", referrer);
    }
}

/// Prints one line per page: status, robots flags, crawl time and URL
pub fn print_page_table(pages: &[PageRecord]) {
    println!("{:<6} {:<5} {:<6} {:<20} URL", "STATUS", "INDEX", "FOLLOW", "LAST CRAWLED");
    for page in pages {
        let status = page
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        let crawled = page
            .last_crawled_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<6} {:<5} {:<6} {:<20} {}",
            status,
            flag(page.robots_index),
            flag(page.robots_follow),
            crawled,
            page.url
        );
    }
    println!("\n{} pages", pages.len());
}
