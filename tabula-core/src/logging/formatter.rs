//! Log formatting options for different output styles

use serde::{Deserialize, Serialize};

/// How logs should be formatted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON format (production default)
    /// Example: {"timestamp":"2024-01-15T10:30:00+00:00","level":"INFO","target":"tabula_core::schema","message":"..."}
    Json,

    /// Human-readable format (development default)
    /// Example: 2024-01-15 10:30:00.000 INFO  [tabula_core::schema] schema cache warmed
    Human,
}

impl LogFormat {
    pub fn format_record(&self, record: &log::Record) -> String {
        match self {
            LogFormat::Json => format_json(record),
            LogFormat::Human => format_human(record),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "human" | "text" => Ok(LogFormat::Human),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

fn format_json(record: &log::Record) -> String {
    let mut json = serde_json::Map::new();

    json.insert(
        "timestamp".to_string(),
        serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
    );
    json.insert(
        "level".to_string(),
        serde_json::Value::String(record.level().as_str().to_string()),
    );
    json.insert("target".to_string(), serde_json::Value::String(record.target().to_string()));
    json.insert("message".to_string(), serde_json::Value::String(record.args().to_string()));

    if let (Some(file), Some(line)) = (record.file(), record.line()) {
        json.insert("file".to_string(), serde_json::Value::String(file.to_string()));
        json.insert("line".to_string(), serde_json::Value::Number(line.into()));
    }

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

fn format_human(record: &log::Record) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("{} {:5} [{}] {}", timestamp, record.level().as_str(), record.target(), record.args())
}
