//! HTTP collaborator implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - GET requests for status codes and page bodies
//! - HEAD requests to check Content-Type
//! - robots.txt and sitemap retrieval
//! - Error classification (transient vs. permanent)

use crate::config::Config;
use crate::crawler::parser::extract_internal_links;
use crate::crawler::sitemaps::parse_sitemap;
use crate::crawler::{CollaboratorError, CrawlCollaborator};
use crate::robots::{ParsedRobots, RobotsRules};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - Full configuration; user agent and request timeout are used
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use crawl_ledger::config::Config;
/// use crawl_ledger::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.crawl.request_timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a transport error onto the collaborator taxonomy
fn classify_error(url: &str, err: reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Unavailable(format!("request timeout for {}", url))
    } else if err.is_connect() {
        CollaboratorError::Unavailable(format!("connection failed for {}: {}", url, err))
    } else {
        CollaboratorError::Invalid(format!("request failed for {}: {}", url, err))
    }
}

fn parse_url(url: &str) -> Result<Url, CollaboratorError> {
    Url::parse(url).map_err(|e| CollaboratorError::Invalid(format!("{}: {}", url, e)))
}

/// Network collaborator backed by reqwest
pub struct HttpCollaborator {
    client: Client,
    max_sitemap_depth: u32,
}

impl HttpCollaborator {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            max_sitemap_depth: config.crawl.max_sitemap_depth,
        })
    }

    async fn get(&self, url: &str) -> Result<Response, CollaboratorError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))
    }

    /// GETs an auxiliary document, `None` on any non-success status
    ///
    /// A 5xx is reported as unavailable so the caller's retry policy applies.
    async fn get_document(&self, url: &str) -> Result<Option<Vec<u8>>, CollaboratorError> {
        let response = self.get(url).await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(CollaboratorError::Unavailable(format!(
                "{} returned {}",
                url, status
            )));
        }
        if !status.is_success() {
            tracing::debug!("{} returned {}", url, status);
            return Ok(None);
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, e))?;
        Ok(Some(body.to_vec()))
    }

    async fn fetch_robots(&self, base: &Url) -> Result<Option<ParsedRobots>, CollaboratorError> {
        let robots_url = base
            .join("/robots.txt")
            .map_err(|e| CollaboratorError::Invalid(e.to_string()))?;
        let Some(body) = self.get_document(robots_url.as_str()).await? else {
            return Ok(None);
        };
        let content = String::from_utf8_lossy(&body);
        Ok(Some(ParsedRobots::from_content(&content)))
    }
}

#[async_trait]
impl CrawlCollaborator for HttpCollaborator {
    async fn fetch_status(&self, url: &str) -> Result<Option<u16>, CollaboratorError> {
        match self.client.get(url).send().await {
            Ok(response) => Ok(Some(response.status().as_u16())),
            Err(e) if e.is_timeout() || e.is_connect() => Err(classify_error(url, e)),
            Err(e) => {
                tracing::debug!("No response for {}: {}", url, e);
                Ok(None)
            }
        }
    }

    async fn extract_internal_links(&self, url: &str) -> Result<Vec<String>, CollaboratorError> {
        let response = self.get(url).await?;
        let page_url = response.url().clone();
        let body = response.text().await.map_err(|e| classify_error(url, e))?;
        Ok(extract_internal_links(&body, &page_url))
    }

    async fn sitemap_urls(
        &self,
        base_url: &str,
    ) -> Result<Vec<(String, String)>, CollaboratorError> {
        let base = parse_url(base_url)?;

        let mut roots = self
            .fetch_robots(&base)
            .await?
            .map(|robots| robots.sitemaps)
            .unwrap_or_default();
        if roots.is_empty() {
            let fallback = base
                .join("/sitemap.xml")
                .map_err(|e| CollaboratorError::Invalid(e.to_string()))?;
            roots.push(fallback.to_string());
        }

        let mut queue: VecDeque<(String, u32)> = roots.into_iter().map(|u| (u, 0)).collect();
        let mut visited = HashSet::new();
        let mut pairs = Vec::new();

        while let Some((sitemap_url, depth)) = queue.pop_front() {
            if !visited.insert(sitemap_url.clone()) {
                continue;
            }
            let Some(xml) = self.get_document(&sitemap_url).await? else {
                continue;
            };

            let document = parse_sitemap(&xml);
            tracing::debug!(
                "Sitemap {}: {} URLs, {} nested sitemaps",
                sitemap_url,
                document.urls.len(),
                document.sitemaps.len()
            );

            for page_url in document.urls {
                let same_host = Url::parse(&page_url)
                    .map(|u| u.host_str() == base.host_str())
                    .unwrap_or(false);
                if same_host {
                    pairs.push((page_url, sitemap_url.clone()));
                }
            }

            if depth < self.max_sitemap_depth {
                queue.extend(document.sitemaps.into_iter().map(|u| (u, depth + 1)));
            } else if !document.sitemaps.is_empty() {
                tracing::warn!(
                    "Sitemap index {} exceeds depth {}; nested sitemaps ignored",
                    sitemap_url,
                    self.max_sitemap_depth
                );
            }
        }

        Ok(pairs)
    }

    async fn fetch_robots_rules(
        &self,
        base_url: &str,
    ) -> Result<Option<RobotsRules>, CollaboratorError> {
        let base = parse_url(base_url)?;
        Ok(self.fetch_robots(&base).await?.map(|robots| robots.rules))
    }

    async fn probe_content_type(&self, url: &str) -> Result<Option<String>, CollaboratorError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;
        Ok(response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }
}
