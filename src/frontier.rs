//! Frontier selection
//!
//! The frontier is every known URL under a domain filter that was never crawled
//! or whose last crawl is older than the staleness window. An empty frontier
//! ends the crawl loop.

use crate::storage::{Storage, StorageResult};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Computes the crawl cutoff for a staleness window
///
/// `days == 0` means "anything not crawled today": the cutoff is the start of
/// the current UTC day, not `now`. Any other value subtracts whole days; a
/// window reaching past the earliest representable instant clamps to it, so
/// only never-crawled URLs are due.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use crawl_ledger::frontier::staleness_cutoff;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 15, 17, 45, 0).unwrap();
/// assert_eq!(
///     staleness_cutoff(now, 0),
///     Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
/// );
/// assert_eq!(
///     staleness_cutoff(now, 30),
///     Utc.with_ymd_and_hms(2024, 2, 14, 17, 45, 0).unwrap()
/// );
/// ```
pub fn staleness_cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    if days == 0 {
        let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN);
        Utc.from_utc_datetime(&midnight)
    } else {
        now.checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Returns the URLs under `domain_filter` that are due for crawling
///
/// `domain_filter` is a plain substring match against the stored URL.
pub fn select<S: Storage + ?Sized>(
    store: &S,
    domain_filter: &str,
    staleness_days: u32,
) -> StorageResult<Vec<String>> {
    let cutoff = staleness_cutoff(Utc::now(), staleness_days);
    let urls = store.select_frontier(domain_filter, cutoff)?;
    tracing::debug!(
        "Frontier for {:?} (staleness {} days, cutoff {}): {} URLs",
        domain_filter,
        staleness_days,
        cutoff,
        urls.len()
    );
    Ok(urls)
}
