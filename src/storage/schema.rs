//! Database schema definitions
//!
//! One row per canonical URL in `pages`; the two set-valued attributes live in
//! child tables whose `UNIQUE(page_id, ...)` constraint makes every append an
//! idempotent `INSERT OR IGNORE`.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One record per canonical page URL
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    discovered_at TEXT NOT NULL,
    last_crawled_at TEXT,
    status_code INTEGER,
    fetch_succeeded INTEGER NOT NULL DEFAULT 0,
    robots_index INTEGER,
    robots_follow INTEGER
);

CREATE INDEX IF NOT EXISTS idx_pages_last_crawled ON pages(last_crawled_at);

-- Sitemaps that list a page
CREATE TABLE IF NOT EXISTS page_sitemaps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    sitemap_url TEXT NOT NULL,
    UNIQUE(page_id, sitemap_url)
);

-- Pages known to link to a page
CREATE TABLE IF NOT EXISTS page_referrers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    referrer_url TEXT NOT NULL,
    UNIQUE(page_id, referrer_url)
);
"#;

/// Initializes the database schema
///
/// Safe to run against an existing database; every statement is
/// `IF NOT EXISTS`.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
