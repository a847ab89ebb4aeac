//! Configuration system for Cairn
//!
//! Configuration values are resolved in the following order (highest
//! priority wins):
//!
//! 1. **Code** (Builder pattern) - Highest priority
//! 2. **Environment Variables** - Override file config
//! 3. **Config File** (cairn.toml) - Override defaults
//! 4. **Defaults** - Lowest priority
//!
//! # Example
//!
//! ```no_run
//! use cairn_core::config::CairnConfig;
//!
//! // Load with full supersedence
//! let config = CairnConfig::load()?;
//!
//! // Or load from specific file
//! let config = CairnConfig::from_file("cairn.toml")?;
//!
//! // Or use defaults
//! let config = CairnConfig::default();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod deploy;
pub mod server;

pub use deploy::{AppConfig, DeployConfig, MappingConfig, VhostConfig};
pub use server::ServerConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete Cairn configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CairnConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

impl CairnConfig {
    /// Load configuration with full supersedence chain
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (cairn.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        Self::load_from("cairn.toml")
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Start with defaults
        let mut config = Self::default();

        // Load from file if it exists
        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        // Apply environment variables (highest priority)
        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.deploy.merge(other.deploy);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.server.apply_env_vars();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.deploy.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CairnConfig::default();
        assert_eq!(config.server.port, 8590);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.deploy.applications.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cairn.toml");
        std::fs::write(
            &path,
            r#"
            [server]
            port = 9590
            host = "0.0.0.0"
            keep_alive_max = 3

            [[deploy.applications]]
            name = "site"
            webapp_path = "/srv/site"
            context = "/"
            "#,
        )
        .unwrap();

        let config = CairnConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9590);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.keep_alive_max, 3);
        // Fields absent from the file keep their defaults.
        assert_eq!(config.server.receive_timeout, 5);
        assert_eq!(config.deploy.applications[0].context_path(), "/");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = CairnConfig::load_from("/nonexistent/cairn.toml").unwrap();
        assert_eq!(config.server.port, 8590);
    }
}
