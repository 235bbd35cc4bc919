use crate::config::types::{Config, CrawlConfig, RetryConfig, StoreConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// A century; larger windows only ever select never-crawled pages
const MAX_STALENESS_DAYS: u32 = 36_500;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_store_config(&config.store)?;
    validate_retry_config(&config.retry)?;
    validate_crawl_config(&config.crawl)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }
    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.staleness_days > MAX_STALENESS_DAYS {
        return Err(ConfigError::Validation(format!(
            "staleness_days must be <= {}, got {}",
            MAX_STALENESS_DAYS, config.staleness_days
        )));
    }
    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}
