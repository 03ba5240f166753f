//! SQLite-backed engine
//!
//! Each session is a fresh read-only connection. SQLite stores temporal values
//! as text, so cells of columns declared `DATE`, `TIME` or `TIMESTAMP` are
//! parsed back into typed values when they are well formed.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::{ColumnDescriptor, ResultSet, SqlEngine, SqlSession};
use crate::relations::ForeignKey;
use crate::sql::quote_identifier;
use crate::value::CellValue;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct SqliteEngine {
    path: PathBuf,
    read_only: bool,
}

impl SqliteEngine {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), read_only: true }
    }

    /// Allow writes through sessions (used by loaders, never by request handling)
    pub fn writable(mut self) -> Self {
        self.read_only = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SqlEngine for SqliteEngine {
    fn connect(&self) -> Result<Box<dyn SqlSession>> {
        let access = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| Error::execution(format!("cannot open {}: {}", self.path.display(), e)))?;
        Ok(Box::new(SqliteSession { conn }))
    }
}

pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl SqlSession for SqliteSession {
    fn execute(&self, sql: &str) -> Result<ResultSet> {
        let mut stmt = self.conn.prepare(sql).map_err(execution_error)?;
        let columns: Vec<ColumnDescriptor> = stmt
            .columns()
            .iter()
            .map(|c| ColumnDescriptor::new(c.name(), c.decl_type().unwrap_or_default()))
            .collect();

        let mut rows = stmt.query([]).map_err(execution_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(execution_error)? {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                let value = row.get_ref(idx).map_err(execution_error)?;
                values.push(convert_value(value, &column.data_type));
            }
            out.push(values);
        }

        Ok(ResultSet { columns, rows: out })
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(execution_error)
    }

    fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let pragma = match table.rsplit_once('.') {
            Some((schema, name)) => {
                format!("PRAGMA {}.table_info({})", quote_identifier(schema), quote_identifier(name))
            }
            None => format!("PRAGMA table_info({})", quote_identifier(table)),
        };

        let mut stmt = self.conn.prepare(&pragma).map_err(execution_error)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnDescriptor::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(execution_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(execution_error)?;

        if columns.is_empty() {
            return Err(Error::execution(format!("no such table: {}", table)));
        }
        Ok(columns)
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') \
                 AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(execution_error)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(execution_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(execution_error)?;
        Ok(names)
    }

    fn foreign_keys(&self) -> Result<Option<Vec<ForeignKey>>> {
        let mut keys = Vec::new();
        for table in self.table_names()? {
            let pragma = format!("PRAGMA foreign_key_list({})", quote_identifier(&table));
            let mut stmt = self.conn.prepare(&pragma).map_err(execution_error)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ForeignKey {
                        table: table.clone(),
                        referenced_table: row.get::<_, String>(2)?,
                        column: row.get::<_, String>(3)?,
                        // NULL when the FK targets the primary key implicitly
                        referenced_column: row
                            .get::<_, Option<String>>(4)?
                            .unwrap_or_else(|| "id".to_string()),
                    })
                })
                .map_err(execution_error)?;
            for fk in rows {
                keys.push(fk.map_err(execution_error)?);
            }
        }
        Ok(Some(keys))
    }
}

fn execution_error(err: rusqlite::Error) -> Error {
    Error::Execution(err.to_string())
}

fn convert_value(value: ValueRef<'_>, declared: &str) -> CellValue {
    let declared = declared.to_ascii_uppercase();
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) if declared.starts_with("BOOL") => CellValue::Bool(i != 0),
        ValueRef::Integer(i) => CellValue::Int(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            parse_temporal(&text, &declared).unwrap_or(CellValue::String(text))
        }
        ValueRef::Blob(bytes) => CellValue::Binary(bytes.to_vec()),
    }
}

fn parse_temporal(text: &str, declared: &str) -> Option<CellValue> {
    if declared.starts_with("TIMESTAMP") || declared.starts_with("DATETIME") {
        return text
            .parse::<NaiveDateTime>()
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").ok())
            .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").ok())
            .map(CellValue::DateTime);
    }
    if declared == "DATE" {
        return text.parse::<NaiveDate>().ok().map(CellValue::Date);
    }
    if declared.starts_with("TIME") {
        return text.parse::<NaiveTime>().ok().map(CellValue::Time);
    }
    None
}
