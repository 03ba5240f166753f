//! Schema cache configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a schema snapshot
    /// Env: TABULA_SCHEMA_TTL
    /// Default: 300
    pub schema_ttl_secs: u64,

    /// Introspect every known collection in the background at startup
    /// Env: TABULA_WARM_UP
    /// Default: false
    pub warm_up: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { schema_ttl_secs: 300, warm_up: false }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.schema_ttl_secs)
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(ttl) = env::var("TABULA_SCHEMA_TTL") {
            if let Ok(t) = ttl.parse() {
                self.schema_ttl_secs = t;
            }
        }

        if let Ok(enabled) = env::var("TABULA_WARM_UP") {
            self.warm_up = enabled.parse().unwrap_or(false);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_ttl_secs == 0 {
            bail!("Invalid schema_ttl_secs: must be greater than 0");
        }
        Ok(())
    }
}
