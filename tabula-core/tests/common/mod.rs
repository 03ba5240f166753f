//! Sales database used by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use rusqlite::Connection;
use tabula_core::prelude::*;
use tempfile::TempDir;

const SALES_SQL: &str = include_str!("../fixtures/sales.sql");

include!("../fixtures/sales_catalog.rs");

pub struct Sales {
    _dir: TempDir,
    pub engine: SqliteEngine,
}

impl Sales {
    /// Ten customers, five orders (one without a customer), three items
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.db");
        Connection::open(&path).unwrap().execute_batch(SALES_SQL).unwrap();

        Self { _dir: dir, engine: SqliteEngine::open(&path) }
    }

    pub fn catalog() -> CollectionCatalog {
        sales_catalog()
    }

    pub fn service(&self) -> ODataService {
        self.service_with(TabulaConfig::default())
    }

    pub fn service_with(&self, config: TabulaConfig) -> ODataService {
        self.service_for(Self::catalog(), config)
    }

    pub fn service_for(&self, catalog: CollectionCatalog, config: TabulaConfig) -> ODataService {
        ODataService::new(Arc::new(catalog), Arc::new(self.engine.clone()), config)
    }
}

pub fn get(service: &ODataService, collection: &str, query: &str) -> ODataResponse {
    service.collection("sales", collection, &QueryParams::parse(query), MetadataLevel::Minimal)
}

pub fn ids(response: &ODataResponse) -> Vec<i64> {
    response.json_body().unwrap()["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect()
}
