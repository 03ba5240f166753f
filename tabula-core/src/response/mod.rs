//! Response shaping and HTTP rendering
//!
//! Every service operation produces an [`ODataResponse`]; turning it into an
//! `http::Response` adds the protocol headers and, for failures, the error
//! envelope `{"error": {"message": ...}}`.

pub mod format;
pub mod negotiate;

pub use format::{
    collection_envelope, context_url, entity_context_url, entity_envelope, format_row, format_rows,
};
pub use negotiate::MetadataLevel;

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde_json::{json, Value};

use crate::Error;

pub const ODATA_VERSION: &str = "4.0";
pub const XML_CONTENT_TYPE: &str = "application/xml";

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Xml(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ODataResponse {
    pub status: StatusCode,
    pub body: Body,
    pub metadata: MetadataLevel,
}

impl ODataResponse {
    pub fn json(value: Value, metadata: MetadataLevel) -> Self {
        Self { status: StatusCode::OK, body: Body::Json(value), metadata }
    }

    pub fn xml(document: String) -> Self {
        Self { status: StatusCode::OK, body: Body::Xml(document), metadata: MetadataLevel::default() }
    }

    pub fn error(err: &Error, metadata: MetadataLevel) -> Self {
        let status = err.status();
        if status.is_server_error() {
            log::error!("request failed: {}", err);
        } else {
            log::debug!("request rejected ({}): {}", status, err);
        }
        Self { status, body: Body::Json(error_envelope(&err.to_string())), metadata }
    }

    /// Collapse a fallible operation into a response
    pub fn from_result(result: crate::Result<Self>, metadata: MetadataLevel) -> Self {
        result.unwrap_or_else(|e| Self::error(&e, metadata))
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            Body::Xml(_) => None,
        }
    }

    pub fn content_type(&self) -> String {
        match self.body {
            Body::Json(_) => self.metadata.content_type(),
            Body::Xml(_) => XML_CONTENT_TYPE.to_string(),
        }
    }

    pub fn body_string(&self) -> String {
        match &self.body {
            Body::Json(value) => value.to_string(),
            Body::Xml(document) => document.clone(),
        }
    }

    pub fn into_http(self) -> Response<Full<Bytes>> {
        Response::builder()
            .status(self.status)
            .header("Content-Type", self.content_type())
            .header("OData-Version", ODATA_VERSION)
            .body(Full::new(Bytes::from(self.body_string())))
            .expect("valid HTTP response")
    }
}

pub fn error_envelope(message: &str) -> Value {
    json!({ "error": { "message": message } })
}
