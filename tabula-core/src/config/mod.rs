//! Configuration system for Tabula
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (builder methods on the sections)
//! 2. **Environment Variables** (`TABULA_*`)
//! 3. **Config File** (`tabula.toml`)
//! 4. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use tabula_core::config::TabulaConfig;
//!
//! let config = TabulaConfig::load()?;
//! let config = TabulaConfig::from_file("tabula.toml")?;
//! let config = TabulaConfig::default();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cache;
pub mod logging;
pub mod query;
pub mod service;

pub use cache::CacheConfig;
pub use logging::LoggingConfig;
pub use query::{NextLinkMode, ParsePolicy, QueryConfig};
pub use service::ServiceConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete Tabula configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TabulaConfig {
    pub service: ServiceConfig,
    pub query: QueryConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl TabulaConfig {
    /// Load configuration with the full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from("tabula.toml")
    }

    /// Load configuration from a specific file, falling back to defaults when absent
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.service.merge(other.service);
        self.query.merge(other.query);
        self.cache.merge(other.cache);
        self.logging.merge(other.logging);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.service.apply_env_vars();
        self.query.apply_env_vars();
        self.cache.apply_env_vars();
        self.logging.apply_env_vars();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.service.validate()?;
        self.query.validate()?;
        self.cache.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
