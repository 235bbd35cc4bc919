//! Crawl-Ledger: crawl frontier and page-state store
//!
//! This crate keeps the durable record of every URL a site crawl knows about:
//! when it was discovered, whether its last fetch succeeded, who links to it,
//! which sitemaps list it, and what robots directives say about indexing it.
//! The crawl loop itself only talks to the network through the
//! [`crawler::CrawlCollaborator`] trait.

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod output;
pub mod retry;
pub mod robots;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Crawl-Ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] crawler::CollaboratorError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl aborted during {phase}: {message}")]
    Fatal {
        phase: crawler::CrawlPhase,
        message: String,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Crawl-Ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlCollaborator, CrawlReport, HttpCollaborator};
pub use retry::{RetryPolicy, Transient};
pub use robots::{resolve, Indexability, RobotsRules};
pub use storage::{DiscoverOutcome, MergeOutcome, PageRecord, SqliteStorage, Storage};
pub use url::{is_page, normalize_url};
