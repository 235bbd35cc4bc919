//! Scripted collaborator for orchestrator tests

use async_trait::async_trait;
use crawl_ledger::crawler::{CollaboratorError, CrawlCollaborator};
use crawl_ledger::{RetryPolicy, RobotsRules};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Collaborator whose answers are fixed up front
///
/// Unscripted URLs answer 200 with no links.
#[derive(Default)]
pub struct ScriptedCollaborator {
    pub statuses: HashMap<String, Option<u16>>,
    pub links: HashMap<String, Vec<String>>,
    pub sitemap_entries: Vec<(String, String)>,
    pub robots: Option<RobotsRules>,
    pub content_types: HashMap<String, String>,
    /// URLs whose status fetch always times out
    pub status_unavailable: HashSet<String>,
    /// URLs whose link extraction always times out
    pub links_unavailable: HashSet<String>,
    pub sitemaps_unavailable: bool,
    pub robots_unavailable: bool,
    pub status_calls: Mutex<Vec<String>>,
}

impl ScriptedCollaborator {
    pub fn status(mut self, url: &str, status: Option<u16>) -> Self {
        self.statuses.insert(url.to_string(), status);
        self
    }

    pub fn links(mut self, url: &str, links: &[&str]) -> Self {
        self.links
            .insert(url.to_string(), links.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn sitemap_entry(mut self, url: &str, sitemap_url: &str) -> Self {
        self.sitemap_entries
            .push((url.to_string(), sitemap_url.to_string()));
        self
    }

    pub fn robots(mut self, rules: RobotsRules) -> Self {
        self.robots = Some(rules);
        self
    }

    pub fn status_calls_for(&self, url: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }
}

fn timeout(url: &str) -> CollaboratorError {
    CollaboratorError::Unavailable(format!("timeout for {}", url))
}

#[async_trait]
impl CrawlCollaborator for ScriptedCollaborator {
    async fn fetch_status(&self, url: &str) -> Result<Option<u16>, CollaboratorError> {
        self.status_calls.lock().unwrap().push(url.to_string());
        if self.status_unavailable.contains(url) {
            return Err(timeout(url));
        }
        Ok(self.statuses.get(url).copied().unwrap_or(Some(200)))
    }

    async fn extract_internal_links(&self, url: &str) -> Result<Vec<String>, CollaboratorError> {
        if self.links_unavailable.contains(url) {
            return Err(timeout(url));
        }
        Ok(self.links.get(url).cloned().unwrap_or_default())
    }

    async fn sitemap_urls(
        &self,
        base_url: &str,
    ) -> Result<Vec<(String, String)>, CollaboratorError> {
        if self.sitemaps_unavailable {
            return Err(timeout(base_url));
        }
        Ok(self.sitemap_entries.clone())
    }

    async fn fetch_robots_rules(
        &self,
        base_url: &str,
    ) -> Result<Option<RobotsRules>, CollaboratorError> {
        if self.robots_unavailable {
            return Err(timeout(base_url));
        }
        Ok(self.robots.clone())
    }

    async fn probe_content_type(&self, url: &str) -> Result<Option<String>, CollaboratorError> {
        Ok(self.content_types.get(url).cloned())
    }
}

/// Retry policy that keeps tests fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}
