//! Service root configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Public URL under which groups are served, e.g. `https://host/odata`
    /// Env: TABULA_BASE_URL
    /// Default: "http://localhost:8080/odata"
    pub base_url: String,

    /// CSDL schema namespace
    /// Env: TABULA_NAMESPACE
    /// Default: "Default"
    pub namespace: String,

    /// CSDL entity container name
    /// Default: "Container"
    pub container_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/odata".to_string(),
            namespace: "Default".to_string(),
            container_name: "Container".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Base URL without a trailing slash
    pub fn root_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Service root of one collection group
    pub fn group_url(&self, group: &str) -> String {
        format!("{}/{}", self.root_url(), group)
    }

    pub fn merge(&mut self, other: Self) {
        self.base_url = other.base_url;
        self.namespace = other.namespace;
        self.container_name = other.container_name;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(url) = env::var("TABULA_BASE_URL") {
            self.base_url = url;
        }

        if let Ok(namespace) = env::var("TABULA_NAMESPACE") {
            self.namespace = namespace;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("Invalid base_url: cannot be empty");
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!("Invalid base_url: {} must be an http(s) URL", self.base_url);
        }

        if self.namespace.is_empty()
            || !self.namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            bail!("Invalid namespace: {:?}", self.namespace);
        }

        Ok(())
    }
}
