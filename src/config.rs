use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::discovery::DiscoveryOptions;

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub fetch: FetchConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Domains whose links count as originals. Empty means any domain.
    pub domains: Vec<String>,
    pub include_redirect_sources: bool,
    pub include_reserved_hosts: bool,
    pub max_redirect_fetches: Option<usize>,
    /// Resolve candidate links over HTTP
    pub follow_redirects: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub max_redirects: usize,
    pub user_agent: Option<String>,
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            domains: vec![],
            include_redirect_sources: true,
            include_reserved_hosts: true,
            max_redirect_fetches: None,
            follow_redirects: false,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_redirects: 10,
            user_agent: None,
        }
    }
}

impl From<&DiscoveryConfig> for DiscoveryOptions {
    fn from(config: &DiscoveryConfig) -> Self {
        DiscoveryOptions {
            domains: config.domains.clone(),
            include_redirect_sources: config.include_redirect_sources,
            include_reserved_hosts: config.include_reserved_hosts,
            max_redirect_fetches: config.max_redirect_fetches,
        }
    }
}
