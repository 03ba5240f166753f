//! Tabula - Core
//!
//! Read-only OData v4 over relational collections.
//!
//! # Overview
//!
//! A collection is a named query (a table, a view or arbitrary SQL) exposed
//! as an OData entity set. Tabula translates the system query options of a
//! request (`$filter`, `$select`, `$orderby`, `$expand`, `$top`, `$skip`,
//! `$count`) into layered SQL over the collection's base query, runs it
//! through an [`engine::SqlEngine`], and shapes the rows into OData JSON
//! envelopes. It also serves `$metadata` as a CSDL document built from cached
//! column schemas and discovered relationships.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabula_core::prelude::*;
//!
//! let catalog = CollectionCatalog::new()
//!     .with(Collection::table("sales", "customers", "customers").primary_key(["id"]))?
//!     .with(Collection::table("sales", "orders", "orders").reference("customer_id", "customers(id)")?)?;
//!
//! let service = ODataService::new(
//!     Arc::new(catalog),
//!     Arc::new(SqliteEngine::open("shop.db")),
//!     TabulaConfig::load()?,
//! );
//!
//! let response = service.handle("/sales/orders", "$expand=Customer&$top=10", None);
//! let http = response.into_http();
//! ```
//!
//! # Architecture
//!
//! - [`filter`] - `$filter` parsing into SQL conditions
//! - [`query`] - system query options and the layered query builder
//! - [`schema`] - per-collection column cache with TTL
//! - [`relations`] - declared and discovered relationships
//! - [`metadata`] - CSDL generation
//! - [`service`] - request-level operations

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod navigation;
pub mod pagination;
pub mod query;
pub mod relations;
pub mod response;
pub mod schema;
pub mod service;
pub mod sql;
pub mod value;

#[cfg(test)]
pub mod testing;

pub mod prelude;

pub use config::TabulaConfig;
pub use engine::{SqlEngine, SqlSession, SqliteEngine};
pub use error::{Error, Result};
pub use model::{Collection, CollectionCatalog, CollectionRegistry};
pub use response::{MetadataLevel, ODataResponse};
pub use schema::SchemaCache;
pub use service::ODataService;
pub use value::CellValue;
