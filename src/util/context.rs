//! Global context: per-user directories and loaded configuration.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use directories::ProjectDirs;

use crate::util::config::Config;

/// Project directories for npm-readfile
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "npm-readfile", "npm-readfile"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Root of the on-disk cache
    cache_dir: PathBuf,

    /// Location of `config.toml`, when loaded from one
    config_path: Option<PathBuf>,

    /// Loaded configuration
    config: Config,
}

impl GlobalContext {
    /// Create a context from the per-user directories and config file.
    pub fn new() -> Result<Self> {
        let (data_dir, config_dir) = match PROJECT_DIRS.as_ref() {
            Some(dirs) => (
                dirs.data_dir().to_path_buf(),
                dirs.config_dir().to_path_buf(),
            ),
            None => {
                // Fallback to ~/.npm-readfile
                let home = dirs::home_dir()
                    .map(|h| h.join(".npm-readfile"))
                    .unwrap_or_else(|| PathBuf::from(".npm-readfile"));
                (home.clone(), home)
            }
        };

        let config_path = config_dir.join("config.toml");
        let config = Config::load_or_default(&config_path);
        let cache_dir = config.cache.dir.clone().unwrap_or(data_dir);

        tracing::debug!("Cache root: {}", cache_dir.display());

        Ok(GlobalContext {
            cache_dir,
            config_path: Some(config_path),
            config,
        })
    }

    /// Create a context with an explicit cache root and configuration that
    /// did not come from a file.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>, config: Config) -> Self {
        GlobalContext {
            cache_dir: cache_dir.into(),
            config_path: None,
            config,
        }
    }

    /// Override the cache root.
    pub fn set_cache_dir(&mut self, cache_dir: impl Into<PathBuf>) {
        self.cache_dir = cache_dir.into();
    }

    /// Override the registry used for short addresses.
    pub fn set_registry(&mut self, url: impl Into<String>) {
        self.config.registry.url = url.into();
    }

    /// Root of the on-disk cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the configuration file, if the configuration came from one.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_cache_dir() {
        let mut ctx = GlobalContext::with_cache_dir("/tmp/cache", Config::default());
        assert_eq!(ctx.cache_dir(), Path::new("/tmp/cache"));
        assert_eq!(ctx.config_path(), None);

        ctx.set_registry("http://localhost:4873/");
        assert_eq!(ctx.config().registry.url, "http://localhost:4873/");

        ctx.set_cache_dir("/tmp/other");
        assert_eq!(ctx.cache_dir(), Path::new("/tmp/other"));
    }
}
