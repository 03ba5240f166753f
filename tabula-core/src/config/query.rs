//! System query option configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// When `@odata.nextLink` is emitted for a page that has more rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextLinkMode {
    /// Only when the request itself carried `$top` or `$skip`
    Lazy,
    /// Whenever the over-fetch detected more rows
    #[default]
    ServerDriven,
}

impl std::str::FromStr for NextLinkMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lazy" => Ok(NextLinkMode::Lazy),
            "server_driven" | "server-driven" => Ok(NextLinkMode::ServerDriven),
            other => Err(format!("unknown next link mode: {}", other)),
        }
    }
}

/// What happens when a query option cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsePolicy {
    /// Fail the request with 400
    #[default]
    Reject,
    /// Drop the option and serve the request without it (fail-open)
    #[serde(alias = "lenient")]
    Ignore,
}

impl ParsePolicy {
    pub fn is_lenient(self) -> bool {
        self == ParsePolicy::Ignore
    }
}

impl std::str::FromStr for ParsePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(ParsePolicy::Reject),
            "ignore" | "lenient" => Ok(ParsePolicy::Ignore),
            other => Err(format!("unknown parse policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size used when `$top` is absent
    /// Env: TABULA_PAGE_SIZE
    /// Default: 100
    pub default_page_size: u64,

    /// Upper bound applied to `$top`
    /// Env: TABULA_MAX_PAGE_SIZE
    /// Default: 1000
    pub max_page_size: u64,

    /// Env: TABULA_NEXT_LINK
    /// Default: server_driven
    pub next_link: NextLinkMode,

    /// Policy for `$filter` expressions that neither parser accepts
    /// Env: TABULA_FILTER_POLICY
    /// Default: reject
    pub filter_policy: ParsePolicy,

    /// Policy for malformed `$top`, `$skip` and `$count` literals
    /// Env: TABULA_PARAMETER_POLICY
    /// Default: reject
    pub parameter_policy: ParsePolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
            next_link: NextLinkMode::default(),
            filter_policy: ParsePolicy::default(),
            parameter_policy: ParsePolicy::default(),
        }
    }
}

impl QueryConfig {
    pub fn with_page_size(mut self, default_page_size: u64, max_page_size: u64) -> Self {
        self.default_page_size = default_page_size;
        self.max_page_size = max_page_size;
        self
    }

    pub fn with_next_link(mut self, mode: NextLinkMode) -> Self {
        self.next_link = mode;
        self
    }

    pub fn with_filter_policy(mut self, policy: ParsePolicy) -> Self {
        self.filter_policy = policy;
        self
    }

    pub fn with_parameter_policy(mut self, policy: ParsePolicy) -> Self {
        self.parameter_policy = policy;
        self
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(size) = env::var("TABULA_PAGE_SIZE") {
            if let Ok(s) = size.parse() {
                self.default_page_size = s;
            }
        }

        if let Ok(size) = env::var("TABULA_MAX_PAGE_SIZE") {
            if let Ok(s) = size.parse() {
                self.max_page_size = s;
            }
        }

        if let Ok(mode) = env::var("TABULA_NEXT_LINK") {
            if let Ok(m) = mode.parse() {
                self.next_link = m;
            }
        }

        if let Ok(policy) = env::var("TABULA_FILTER_POLICY") {
            if let Ok(p) = policy.parse() {
                self.filter_policy = p;
            }
        }

        if let Ok(policy) = env::var("TABULA_PARAMETER_POLICY") {
            if let Ok(p) = policy.parse() {
                self.parameter_policy = p;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            bail!("Invalid max_page_size: must be greater than 0");
        }

        if self.default_page_size == 0 {
            bail!("Invalid default_page_size: must be greater than 0");
        }

        if self.default_page_size > self.max_page_size {
            bail!(
                "Invalid default_page_size: {} exceeds max_page_size {}",
                self.default_page_size,
                self.max_page_size
            );
        }

        Ok(())
    }
}
