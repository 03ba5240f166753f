//! `odata.metadata` content negotiation

use std::fmt;

/// Requested level of control information in JSON payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataLevel {
    #[default]
    Minimal,
    Full,
    /// No `@odata.context` in envelopes
    None,
}

impl MetadataLevel {
    fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "minimal" => Some(MetadataLevel::Minimal),
            "full" => Some(MetadataLevel::Full),
            "none" => Some(MetadataLevel::None),
            _ => None,
        }
    }

    /// Level named by the first `odata.metadata=` parameter in `text`
    fn find_in(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        let start = lower.find("odata.metadata=")? + "odata.metadata=".len();
        let value = lower[start..].split([';', ',', ' ']).next().unwrap_or_default();
        Self::from_token(value)
    }

    /// From an `Accept` header; anything unrecognised is `minimal`
    pub fn from_accept(accept: Option<&str>) -> Self {
        accept.and_then(Self::find_in).unwrap_or_default()
    }

    /// `$format` wins over `Accept`
    pub fn negotiate(accept: Option<&str>, format: Option<&str>) -> Self {
        format.and_then(Self::find_in).unwrap_or_else(|| Self::from_accept(accept))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetadataLevel::Minimal => "minimal",
            MetadataLevel::Full => "full",
            MetadataLevel::None => "none",
        }
    }

    pub fn includes_context(self) -> bool {
        self != MetadataLevel::None
    }

    pub fn content_type(self) -> String {
        format!(
            "application/json;odata.metadata={};odata.streaming=true;IEEE754Compatible=false",
            self.as_str()
        )
    }
}

impl fmt::Display for MetadataLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
