//! Configuration management for Gorium
//!
//! Uses XDG-compliant paths:
//! - Config: ~/.config/gorium/config.toml
//! - Profiles: ~/.config/gorium/profiles.json
//! - Data (logs): ~/.local/share/gorium/

mod paths;

pub use paths::Paths;

use crate::sync::HashAlgorithm;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_REGISTRY_URL: &str = "https://api.modrinth.com/v2/";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Digest used to fingerprint the mods folder
    pub hash_algorithm: HashAlgorithm,

    /// Registry connection settings
    pub registry: RegistryConfig,

    /// Download executor settings
    pub download: DownloadConfig,

    /// Paths configuration
    #[serde(skip)]
    pub paths: Paths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha512,
            registry: RegistryConfig::default(),
            download: DownloadConfig::default(),
            paths: Paths::new(),
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// API root, must end with a slash
    pub base_url: String,

    /// Timeout for metadata requests (search, versions, hash lookups)
    pub timeout_secs: u64,

    /// Maximum number of search hits requested
    pub search_limit: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
            timeout_secs: 5,
            search_limit: 100,
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Maximum parallel transfers
    pub concurrency: usize,

    /// A transfer that receives no bytes for this long fails
    pub idle_timeout_secs: u64,

    /// Extra attempts after a retryable failure
    pub max_retries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            idle_timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl DownloadConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Config {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.concurrency == 0 {
            bail!("download.concurrency must be at least 1");
        }
        if self.registry.timeout_secs == 0 {
            bail!("registry.timeout_secs must be at least 1");
        }
        if self.download.idle_timeout_secs == 0 {
            bail!("download.idle_timeout_secs must be at least 1");
        }
        url::Url::parse(&self.registry.base_url)
            .with_context(|| format!("Invalid registry.base_url '{}'", self.registry.base_url))?;
        Ok(())
    }

    /// Ensure required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        self.paths
            .ensure_dirs()
            .context("Failed to create default application directories")
    }

    /// Load configuration from disk or create default
    pub async fn load() -> Result<Self> {
        Self::load_from(Paths::new()).await
    }

    /// Load configuration using explicit paths
    pub async fn load_from(paths: Paths) -> Result<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            toml::from_str::<Config>(&content).context("Failed to parse config file")?
        } else {
            // Create default config
            let config = Config {
                paths: paths.clone(),
                ..Config::default()
            };
            config.save().await?;
            config
        };

        config.paths = paths;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self) -> Result<()> {
        let config_path = self.paths.config_file();

        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .await
            .context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());

        let config = Config::load_from(paths.clone()).await.unwrap();
        assert!(paths.config_file().exists());
        assert_eq!(config.registry.base_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.registry.timeout_secs, 5);
        assert_eq!(config.download.concurrency, 4);
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha512);
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        std::fs::create_dir_all(paths.config_dir()).unwrap();
        std::fs::write(
            paths.config_file(),
            "hash_algorithm = \"sha1\"\n[download]\nconcurrency = 8\n",
        )
        .unwrap();

        let config = Config::load_from(paths).await.unwrap();
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha1);
        assert_eq!(config.download.concurrency, 8);
        assert_eq!(config.download.max_retries, 2);
        assert_eq!(config.registry.search_limit, 100);
    }

    #[tokio::test]
    async fn zero_concurrency_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        std::fs::create_dir_all(paths.config_dir()).unwrap();
        std::fs::write(paths.config_file(), "[download]\nconcurrency = 0\n").unwrap();

        assert!(Config::load_from(paths).await.is_err());
    }
}
