//! Application configuration management.
//!
//! Configuration is stored at `~/.config/appcache/config.json` and holds the
//! retrieval strategy, catalog TTL, cache location and network timeout.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use appcache_core::cache::DEFAULT_CATALOG_TTL;
use appcache_core::fetch::DEFAULT_CONNECT_TIMEOUT_SECS;
use appcache_core::RetrievalStrategy;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "appcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "APPCACHE_CACHE_DIR";

fn default_ttl_secs() -> u64 {
    DEFAULT_CATALOG_TTL.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval_strategy: RetrievalStrategy,
    #[serde(default = "default_ttl_secs")]
    pub catalog_ttl_secs: u64,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// `--cache-dir` from the command line, never persisted
    #[serde(skip)]
    pub cache_dir_override: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retrieval_strategy: RetrievalStrategy::default(),
            catalog_ttl_secs: default_ttl_secs(),
            cache_dir: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            cache_dir_override: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Resolve the cache root: command line, environment, config file, then
    /// the platform cache dir.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        self.cache_dir_with_env(std::env::var_os(CACHE_DIR_ENV))
    }

    fn cache_dir_with_env(&self, env_dir: Option<OsString>) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir_override {
            return Ok(dir.clone());
        }
        if let Some(dir) = env_dir.filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
