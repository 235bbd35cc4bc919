//! On-disk page stores shared by several writers

use crate::support::{fast_retry, ScriptedCollaborator};
use crawl_ledger::config::StoreConfig;
use crawl_ledger::storage::SqliteStorage;
use crawl_ledger::{Coordinator, DiscoverOutcome, RetryPolicy, Storage};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const PAGE: &str = "https://ex.com/a";

/// Opens a handle that reports BUSY immediately, so contention goes through
/// the retry policy
fn open_contending(path: &Path) -> SqliteStorage {
    let config = StoreConfig {
        database_path: path.display().to_string(),
        busy_timeout_ms: 0,
    };
    SqliteStorage::open(path, &config, RetryPolicy::new(500, Duration::from_millis(2))).unwrap()
}

#[test]
fn test_concurrent_sitemap_references_are_all_kept() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pages.db");

    let mut first = open_contending(&path);
    let mut second = open_contending(&path);
    first.insert_page(PAGE, None).unwrap();

    let writer_a = thread::spawn(move || {
        for i in 0..25 {
            first
                .add_sitemap_reference(PAGE, &format!("https://ex.com/s1-{}.xml", i))
                .unwrap();
        }
        first
    });
    let writer_b = thread::spawn(move || {
        for i in 0..25 {
            second
                .add_sitemap_reference(PAGE, &format!("https://ex.com/s2-{}.xml", i))
                .unwrap();
        }
        second
    });

    let first = writer_a.join().unwrap();
    writer_b.join().unwrap();

    let page = first.get(PAGE).unwrap().unwrap();
    assert_eq!(page.sitemaps.len(), 50);
    assert!(page.sitemaps.contains("https://ex.com/s1-0.xml"));
    assert!(page.sitemaps.contains("https://ex.com/s2-24.xml"));
}

#[test]
fn test_concurrent_same_referrer_is_stored_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pages.db");

    let mut seed = open_contending(&path);
    seed.insert_page(PAGE, None).unwrap();

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let mut store = open_contending(&path);
            thread::spawn(move || {
                for _ in 0..10 {
                    store.add_referrer(PAGE, "https://ex.com").unwrap();
                    store.add_referrer(PAGE, "https://ex.com/b").unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let page = seed.get(PAGE).unwrap().unwrap();
    assert_eq!(page.referring_pages.len(), 2);
}

#[test]
fn test_concurrent_discovery_inserts_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pages.db");
    let _init = open_contending(&path);

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let mut store = open_contending(&path);
            thread::spawn(move || store.insert_page(PAGE, None).unwrap())
        })
        .collect();
    let inserted = writers
        .into_iter()
        .map(|writer| writer.join().unwrap())
        .filter(|outcome| *outcome == DiscoverOutcome::Inserted)
        .count();

    assert_eq!(inserted, 1);
    assert_eq!(open_contending(&path).count_pages("ex.com").unwrap(), 1);
}

#[test]
fn test_reopen_keeps_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pages.db");

    {
        let mut store = open_contending(&path);
        store.insert_page(PAGE, Some("https://ex.com")).unwrap();
        store.record_crawl_result(PAGE, Some(200), true).unwrap();
    }

    let store = open_contending(&path);
    let page = store.get(PAGE).unwrap().unwrap();
    assert_eq!(page.status_code, Some(200));
    assert!(page.referring_pages.contains("https://ex.com"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crawl_waits_out_a_held_write_lock() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pages.db");
    let store = open_contending(&path);

    let (locked, wait_for_lock) = mpsc::channel();
    let holder_path = path.clone();
    let holder = thread::spawn(move || {
        let mut conn = Connection::open(&holder_path).unwrap();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();
        locked.send(()).unwrap();
        thread::sleep(Duration::from_millis(100));
        tx.commit().unwrap();
    });
    wait_for_lock.recv().unwrap();

    let mut coordinator = Coordinator::new(store, ScriptedCollaborator::default(), fast_retry());
    let report = coordinator.crawl("https://ex.com", 30).await.unwrap();
    holder.join().unwrap();

    assert_eq!(report.pages_crawled, 1);
    let page = coordinator.get_page("https://ex.com").unwrap().unwrap();
    assert!(page.fetch_succeeded);
}
