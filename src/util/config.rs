//! Configuration file support.
//!
//! The configuration lives at `<config dir>/config.toml`:
//!
//! ```toml
//! [registry]
//! url = "https://registry.npmjs.org/"
//!
//! [cache]
//! dir = "/var/cache/npm-readfile"
//! index_ttl_ms = 30000
//!
//! [net]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default registry used to expand short addresses.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org/";

/// Default staleness window for cached index documents, in milliseconds.
pub const DEFAULT_INDEX_TTL_MS: u64 = 30_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry settings
    pub registry: RegistryConfig,

    /// Cache settings
    pub cache: CacheConfig,

    /// Network settings
    pub net: NetConfig,
}

/// Registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry base URL
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root override
    pub dir: Option<PathBuf>,

    /// Maximum age of a cached index document before it is refetched
    pub index_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            dir: None,
            index_ttl_ms: DEFAULT_INDEX_TTL_MS,
        }
    }
}

impl CacheConfig {
    /// The staleness window as a duration.
    pub fn index_ttl(&self) -> Duration {
        Duration::from_millis(self.index_ttl_ms)
    }
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: None,
        }
    }
}

impl NetConfig {
    /// User agent sent with every request.
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("npm-readfile/{}", env!("CARGO_PKG_VERSION")))
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            toml::to_string_pretty(self).with_context(|| "failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
