//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Writes run inside `BEGIN IMMEDIATE` so the existence check and the change
//! happen under one write lock; a busy or locked database is retried through
//! the configured [`RetryPolicy`].

use crate::config::StoreConfig;
use crate::retry::RetryPolicy;
use crate::robots::Indexability;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{format_timestamp, parse_timestamp, DiscoverOutcome, MergeOutcome, PageRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

const PAGE_COLUMNS: &str = "id, url, discovered_at, last_crawled_at, status_code, \
                            fetch_succeeded, robots_index, robots_follow";

const INSERT_SITEMAP_SQL: &str =
    "INSERT OR IGNORE INTO page_sitemaps (page_id, sitemap_url) VALUES (?1, ?2)";

const INSERT_REFERRER_SQL: &str =
    "INSERT OR IGNORE INTO page_referrers (page_id, referrer_url) VALUES (?1, ?2)";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    retry: RetryPolicy,
}

/// A `pages` row before timestamps are parsed
struct PageRow {
    id: i64,
    url: String,
    discovered_at: String,
    last_crawled_at: Option<String>,
    status_code: Option<i64>,
    fetch_succeeded: bool,
    robots_index: Option<bool>,
    robots_follow: Option<bool>,
}

impl PageRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            discovered_at: row.get(2)?,
            last_crawled_at: row.get(3)?,
            status_code: row.get(4)?,
            fetch_succeeded: row.get(5)?,
            robots_index: row.get(6)?,
            robots_follow: row.get(7)?,
        })
    }

    fn into_record(
        self,
        sitemaps: BTreeSet<String>,
        referring_pages: BTreeSet<String>,
    ) -> StorageResult<PageRecord> {
        let discovered_at = parse_timestamp(&self.discovered_at).map_err(|e| {
            StorageError::Corrupt(format!("{}: discovered_at {:?}: {}", self.url, self.discovered_at, e))
        })?;
        let last_crawled_at = match self.last_crawled_at.as_deref() {
            Some(raw) => Some(parse_timestamp(raw).map_err(|e| {
                StorageError::Corrupt(format!("{}: last_crawled_at {:?}: {}", self.url, raw, e))
            })?),
            None => None,
        };
        let status_code = self
            .status_code
            .map(u16::try_from)
            .transpose()
            .map_err(|_| {
                StorageError::Corrupt(format!("{}: status code {:?}", self.url, self.status_code))
            })?;

        Ok(PageRecord {
            url: self.url,
            discovered_at,
            last_crawled_at,
            status_code,
            fetch_succeeded: self.fetch_succeeded,
            sitemaps,
            referring_pages,
            robots_index: self.robots_index,
            robots_follow: self.robots_follow,
        })
    }
}

impl SqliteStorage {
    /// Opens (or creates) the page store at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `config` - Store settings (busy timeout)
    /// * `retry` - Policy applied to every read and write, including schema setup
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Database opened and schema in place
    /// * `Err(StorageError)` - Failed to open or initialize the database
    pub fn open(path: &Path, config: &StoreConfig, retry: RetryPolicy) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        retry.run(|| {
            let mode: String =
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            tracing::trace!("journal mode {}", mode);
            conn.execute_batch(
                "
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
            ",
            )?;
            initialize_schema(&conn)
        })?;

        tracing::debug!("Opened page store at {}", path.display());
        Ok(Self { conn, retry })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            retry: RetryPolicy::none(),
        })
    }

    /// Runs `op` inside an IMMEDIATE transaction, retrying the whole
    /// transaction on a busy or locked database
    fn write<T, F>(&mut self, mut op: F) -> StorageResult<T>
    where
        F: FnMut(&Transaction<'_>) -> rusqlite::Result<T>,
    {
        let conn = &mut self.conn;
        self.retry
            .run(|| -> rusqlite::Result<T> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let value = op(&tx)?;
                tx.commit()?;
                Ok(value)
            })
            .map_err(StorageError::from)
    }

    fn read<T, F>(&self, mut op: F) -> StorageResult<T>
    where
        F: FnMut(&Connection) -> rusqlite::Result<T>,
    {
        let conn = &self.conn;
        self.retry.run(|| op(conn)).map_err(StorageError::from)
    }

    fn append_child(&mut self, insert_sql: &str, url: &str, value: &str) -> StorageResult<MergeOutcome> {
        self.write(|tx| {
            let Some(page_id) = find_page_id(tx, url)? else {
                return Ok(MergeOutcome::RecordNotFound);
            };
            let inserted = tx.execute(insert_sql, params![page_id, value])?;
            Ok(if inserted > 0 {
                MergeOutcome::Applied
            } else {
                MergeOutcome::Unchanged
            })
        })
    }
}

fn find_page_id(conn: &Connection, url: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM pages WHERE url = ?1", params![url], |row| {
        row.get(0)
    })
    .optional()
}

fn child_values(conn: &Connection, sql: &str, page_id: i64) -> rusqlite::Result<BTreeSet<String>> {
    let mut stmt = conn.prepare(sql)?;
    let values = stmt
        .query_map(params![page_id], |row| row.get(0))?
        .collect::<rusqlite::Result<BTreeSet<String>>>()?;
    Ok(values)
}

/// Loads one child table for every page matching the domain filter
fn child_values_by_page(
    conn: &Connection,
    sql: &str,
    domain_filter: &str,
) -> rusqlite::Result<HashMap<i64, BTreeSet<String>>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params![domain_filter])?;
    let mut values: HashMap<i64, BTreeSet<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        values.entry(row.get(0)?).or_default().insert(row.get(1)?);
    }
    Ok(values)
}

impl Storage for SqliteStorage {
    // ===== Merge Operations =====

    fn insert_page(&mut self, url: &str, referrer: Option<&str>) -> StorageResult<DiscoverOutcome> {
        let now = format_timestamp(Utc::now());
        let outcome = self.write(|tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO pages (url, discovered_at, fetch_succeeded) VALUES (?1, ?2, 0)",
                params![url, now],
            )?;
            if inserted == 0 {
                return Ok(DiscoverOutcome::AlreadyExists);
            }
            let page_id = tx.last_insert_rowid();
            if let Some(referrer) = referrer {
                tx.execute(INSERT_REFERRER_SQL, params![page_id, referrer])?;
            }
            Ok(DiscoverOutcome::Inserted)
        })?;

        tracing::debug!("insert {} -> {:?}", url, outcome);
        Ok(outcome)
    }

    fn add_sitemap_reference(
        &mut self,
        url: &str,
        sitemap_url: &str,
    ) -> StorageResult<MergeOutcome> {
        self.append_child(INSERT_SITEMAP_SQL, url, sitemap_url)
    }

    fn add_referrer(&mut self, url: &str, referrer_url: &str) -> StorageResult<MergeOutcome> {
        self.append_child(INSERT_REFERRER_SQL, url, referrer_url)
    }

    fn record_crawl_result_at(
        &mut self,
        url: &str,
        status_code: Option<u16>,
        fetch_succeeded: bool,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<MergeOutcome> {
        let crawled_at = format_timestamp(crawled_at);
        self.write(|tx| {
            let updated = tx.execute(
                "UPDATE pages SET status_code = ?1, fetch_succeeded = ?2, last_crawled_at = ?3
                 WHERE url = ?4",
                params![status_code, fetch_succeeded, crawled_at, url],
            )?;
            Ok(if updated > 0 {
                MergeOutcome::Applied
            } else {
                MergeOutcome::RecordNotFound
            })
        })
    }

    fn set_indexability(
        &mut self,
        url: &str,
        flags: Indexability,
    ) -> StorageResult<MergeOutcome> {
        self.write(|tx| {
            let current: Option<(i64, Option<bool>, Option<bool>)> = tx
                .query_row(
                    "SELECT id, robots_index, robots_follow FROM pages WHERE url = ?1",
                    params![url],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            match current {
                None => Ok(MergeOutcome::RecordNotFound),
                Some((_, Some(index), Some(follow)))
                    if index == flags.index && follow == flags.follow =>
                {
                    Ok(MergeOutcome::Unchanged)
                }
                Some((page_id, _, _)) => {
                    tx.execute(
                        "UPDATE pages SET robots_index = ?1, robots_follow = ?2 WHERE id = ?3",
                        params![flags.index, flags.follow, page_id],
                    )?;
                    Ok(MergeOutcome::Applied)
                }
            }
        })
    }

    // ===== Queries =====

    fn get(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let loaded = self.read(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS),
                    params![url],
                    PageRow::from_row,
                )
                .optional()?;
            let Some(row) = row else {
                return Ok(None);
            };
            let sitemaps = child_values(
                conn,
                "SELECT sitemap_url FROM page_sitemaps WHERE page_id = ?1",
                row.id,
            )?;
            let referrers = child_values(
                conn,
                "SELECT referrer_url FROM page_referrers WHERE page_id = ?1",
                row.id,
            )?;
            Ok(Some((row, sitemaps, referrers)))
        })?;

        loaded
            .map(|(row, sitemaps, referrers)| row.into_record(sitemaps, referrers))
            .transpose()
    }

    fn get_all(&self, domain_filter: &str) -> StorageResult<Vec<PageRecord>> {
        let (rows, mut sitemaps, mut referrers) = self.read(|conn| {
            let tx = conn.unchecked_transaction()?;
            let rows = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM pages WHERE instr(url, ?1) > 0 ORDER BY id",
                    PAGE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![domain_filter], PageRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            let sitemaps = child_values_by_page(
                &tx,
                "SELECT s.page_id, s.sitemap_url FROM page_sitemaps s
                 JOIN pages p ON p.id = s.page_id WHERE instr(p.url, ?1) > 0",
                domain_filter,
            )?;
            let referrers = child_values_by_page(
                &tx,
                "SELECT r.page_id, r.referrer_url FROM page_referrers r
                 JOIN pages p ON p.id = r.page_id WHERE instr(p.url, ?1) > 0",
                domain_filter,
            )?;
            tx.commit()?;
            Ok((rows, sitemaps, referrers))
        })?;

        rows.into_iter()
            .map(|row| {
                let page_sitemaps = sitemaps.remove(&row.id).unwrap_or_default();
                let page_referrers = referrers.remove(&row.id).unwrap_or_default();
                row.into_record(page_sitemaps, page_referrers)
            })
            .collect()
    }

    fn select_frontier(
        &self,
        domain_filter: &str,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<Vec<String>> {
        let cutoff = format_timestamp(cutoff);
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT url FROM pages
                 WHERE instr(url, ?1) > 0
                   AND (last_crawled_at IS NULL OR last_crawled_at < ?2)
                 ORDER BY id",
            )?;
            let urls = stmt
                .query_map(params![domain_filter, cutoff], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(urls)
        })
    }

    fn count_pages(&self, domain_filter: &str) -> StorageResult<u64> {
        self.read(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM pages WHERE instr(url, ?1) > 0",
                params![domain_filter],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}
