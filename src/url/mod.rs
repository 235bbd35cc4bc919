//! URL handling module for Crawl-Ledger
//!
//! This module provides URL normalization (the canonical store key), host
//! helpers, and page classification.

mod classify;
mod domain;
mod normalize;

pub use classify::{classify_by_extension, is_html_content_type, is_page, Classification};
pub use domain::{extract_host, same_host, url_path};
pub use normalize::normalize_url;
