//! Logging configuration

use crate::logging::{LogFormat, LogLevel};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env: TABULA_LOG_LEVEL
    pub level: LogLevel,
    /// Env: TABULA_LOG_FORMAT
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: LogLevel::Info, format: LogFormat::Human }
    }
}

impl LoggingConfig {
    /// Structured JSON at info level
    pub fn production() -> Self {
        Self { level: LogLevel::Info, format: LogFormat::Json }
    }

    pub fn development() -> Self {
        Self { level: LogLevel::Debug, format: LogFormat::Human }
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("TABULA_LOG_LEVEL") {
            if let Ok(l) = level.parse() {
                self.level = l;
            }
        }
        if let Ok(format) = env::var("TABULA_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.format = f;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
