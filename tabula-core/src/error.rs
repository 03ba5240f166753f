//! Error taxonomy shared by every stage of request handling.

use http::StatusCode;

/// Result type for Tabula operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Tabula
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Unknown collection, entity key or navigation property
    #[error("{0}")]
    NotFound(String),
    /// Malformed key, reference or system query option
    #[error("{0}")]
    BadRequest(String),
    /// The backing engine rejected or failed a statement
    #[error("{0}")]
    Execution(String),
    /// Invalid configuration or collection declaration
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Error::Execution(message.into())
    }

    /// HTTP status carried by the error envelope
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Execution(_)
            | Error::Config(_)
            | Error::Sqlite(_)
            | Error::SerdeJson(_)
            | Error::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
