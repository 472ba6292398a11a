//! Application configuration management.
//!
//! Configuration is stored at `~/.config/shopcache/config.json`. Cached
//! catalog data and images live under the platform cache directory; the
//! cart and session live under the platform data directory, since they
//! must survive a cache wipe.
//!
//! `SHOPCACHE_API_URL` and `SHOPCACHE_CACHE_DIR` override the file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{CatalogOptions, DEFAULT_LIST_LIMIT, DEFAULT_TTL_MINUTES};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "shopcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "https://dummyjson.com";

const ENV_API_URL: &str = "SHOPCACHE_API_URL";
const ENV_CACHE_DIR: &str = "SHOPCACHE_CACHE_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub catalog_limit: usize,
    pub cache_ttl_minutes: i64,
    /// Overrides the platform cache directory when set
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            catalog_limit: DEFAULT_LIST_LIMIT,
            cache_ttl_minutes: DEFAULT_TTL_MINUTES,
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|v| !v.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Cache TTL, or the default when the configured value is out of range.
    fn cache_ttl(&self) -> Duration {
        Duration::try_minutes(self.cache_ttl_minutes).unwrap_or_else(|| {
            warn!(
                minutes = self.cache_ttl_minutes,
                "cache_ttl_minutes out of range, using default"
            );
            Duration::minutes(DEFAULT_TTL_MINUTES)
        })
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            ttl: self.cache_ttl(),
            list_limit: self.catalog_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "https://dummyjson.com");
        let options = config.catalog_options();
        assert_eq!(options.ttl, Duration::minutes(10));
        assert_eq!(options.list_limit, 30);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"catalog_limit": 5}"#).expect("parse");
        assert_eq!(config.catalog_limit, 5);
        assert_eq!(config.cache_ttl_minutes, 10);
    }

    #[test]
    fn test_huge_ttl_falls_back_to_default() {
        let config: Config =
            serde_json::from_str(r#"{"cache_ttl_minutes": 9223372036854775807}"#).expect("parse");
        assert_eq!(config.catalog_options().ttl, Duration::minutes(DEFAULT_TTL_MINUTES));
    }

    #[test]
    fn test_custom_ttl_is_used() {
        let config: Config = serde_json::from_str(r#"{"cache_ttl_minutes": 60}"#).expect("parse");
        assert_eq!(config.catalog_options().ttl, Duration::hours(1));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|name| match name {
            "SHOPCACHE_API_URL" => Some("http://localhost:8080".to_string()),
            "SHOPCACHE_CACHE_DIR" => Some("/tmp/shopcache".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.cache_dir().expect("cache dir"), PathBuf::from("/tmp/shopcache"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config, Config::default());
    }
}
