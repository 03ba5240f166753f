//! Seam to the backing relational engine
//!
//! The engine is an external collaborator: Tabula only needs to run a SELECT,
//! describe a table, list tables and optionally read a foreign-key catalog.
//! Every request opens its own [`SqlSession`] through [`SqlEngine::connect`],
//! so reads never queue behind a shared connection.

pub mod sqlite;

pub use sqlite::SqliteEngine;

use serde::{Deserialize, Serialize};

use crate::relations::ForeignKey;
use crate::sql::quote_identifier;
use crate::value::CellValue;
use crate::Result;

/// Name and declared type of a result or table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Engine type name as declared, empty when unknown
    pub data_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self { name: name.into(), data_type: data_type.into() }
    }
}

/// Rows of a query, values in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One connection, used for the duration of a single request
pub trait SqlSession {
    fn execute(&self, sql: &str) -> Result<ResultSet>;

    /// Run statements that return no rows
    fn execute_batch(&self, sql: &str) -> Result<()>;

    fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    fn table_names(&self) -> Result<Vec<String>>;

    /// Formal foreign keys, `None` when the engine has no catalog
    fn foreign_keys(&self) -> Result<Option<Vec<ForeignKey>>> {
        Ok(None)
    }

    fn create_temp_view(&self, name: &str, sql: &str) -> Result<()> {
        self.execute_batch(&format!("CREATE TEMP VIEW {} AS {}", quote_identifier(name), sql))
    }

    fn drop_view(&self, name: &str) -> Result<()> {
        self.execute_batch(&format!("DROP VIEW IF EXISTS {}", quote_identifier(name)))
    }
}

/// Opens sessions against the backing store
pub trait SqlEngine: Send + Sync {
    fn connect(&self) -> Result<Box<dyn SqlSession>>;
}
