//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use tabula_core::prelude::*;
//! ```

// === Service ===
pub use crate::service::ODataService;
pub use crate::response::{MetadataLevel, ODataResponse};

// === Configuration ===
pub use crate::config::{NextLinkMode, ParsePolicy, QueryConfig, ServiceConfig, TabulaConfig};
pub use crate::logging::init_logging;

// === Collections ===
pub use crate::model::{BaseQuery, Collection, CollectionCatalog, CollectionRegistry};

// === Engine ===
pub use crate::engine::{SqlEngine, SqlSession, SqliteEngine};
pub use crate::schema::SchemaCache;

// === Requests ===
pub use crate::query::{QueryOptions, QueryParams};

// === Errors ===
pub use crate::error::{Error, Result};
