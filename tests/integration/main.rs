//! Integration tests for Crawl-Ledger
//!
//! - `orchestrator_tests`: crawl runs driven by a scripted in-process collaborator
//! - `store_tests`: on-disk stores shared by concurrent writers
//! - `http_tests`: the reqwest collaborator against wiremock servers

mod http_tests;
mod store_tests;
mod support;
