//! Shared fixtures for unit tests: a small sales database on disk
//!
//! The SQL and catalog live under `tests/fixtures/` so the integration tests
//! load the same data.

use std::sync::Arc;

use rusqlite::Connection;
use tempfile::TempDir;

use crate::config::TabulaConfig;
use crate::engine::SqliteEngine;
use crate::model::{Collection, CollectionCatalog};
use crate::service::ODataService;

/// Schema and rows of the sales database
pub const SALES_SQL: &str = include_str!("../tests/fixtures/sales.sql");

include!("../tests/fixtures/sales_catalog.rs");

pub struct SalesFixture {
    pub dir: TempDir,
    pub engine: SqliteEngine,
}

impl SalesFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.db");
        Connection::open(&path).unwrap().execute_batch(SALES_SQL).unwrap();
        let engine = SqliteEngine::open(&path);
        Self { dir, engine }
    }

    pub fn catalog() -> CollectionCatalog {
        sales_catalog()
    }

    pub fn service(&self, config: TabulaConfig) -> ODataService {
        ODataService::new(Arc::new(Self::catalog()), Arc::new(self.engine.clone()), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SqlEngine;

    #[test]
    fn test_fixture_matches_catalog() {
        let fixture = SalesFixture::new();
        let session = fixture.engine.connect().unwrap();
        for (table, rows) in [("customers", 10), ("orders", 5), ("order_items", 3)] {
            let result = session.execute(&format!("SELECT * FROM {}", table)).unwrap();
            assert_eq!(result.len(), rows, "{}", table);
        }
        assert_eq!(SalesFixture::catalog().len(), 3);
    }
}
