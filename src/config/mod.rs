//! Configuration module for Crawl-Ledger
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing sections fall back to their defaults.
//!
//! # Example
//!
//! ```no_run
//! use crawl_ledger::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-ledger.toml")).unwrap();
//! println!("Staleness window: {} days", config.crawl.staleness_days);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, RetryConfig, StoreConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
