use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Crawl-Ledger
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Page store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How long SQLite itself waits on a locked database before reporting busy (milliseconds)
    #[serde(rename = "busy-timeout-ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "crawl-ledger.db".to_string(),
            busy_timeout_ms: 1000,
        }
    }
}

/// Retry budget shared by the store and collaborator calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed wait between attempts (milliseconds)
    #[serde(rename = "backoff-ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Days after which a crawled page becomes eligible again
    #[serde(rename = "staleness-days")]
    pub staleness_days: u32,

    /// Timeout applied to every outgoing HTTP request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// How many levels of sitemap indexes are followed
    #[serde(rename = "max-sitemap-depth")]
    pub max_sitemap_depth: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            staleness_days: 30,
            request_timeout_secs: 10,
            max_sitemap_depth: 3,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "crawl-ledger".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/crawler".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}
