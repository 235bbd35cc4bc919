use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, parses and validates the TOML file at `path`
///
/// # Returns
///
/// * `Ok(Config)` - Parsed configuration with defaults filled in
/// * `Err(ConfigError)` - The file is unreadable, not TOML, or fails validation
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex SHA-256 digest of the configuration file at `path`
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(digest(&std::fs::read_to_string(path)?))
}

/// Loads a configuration together with the digest of the exact text parsed
///
/// The digest is logged at startup so a store can be traced back to the
/// settings that wrote it.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, digest(&content)))
}

fn digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
