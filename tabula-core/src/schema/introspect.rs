//! Column discovery for a single collection

use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::{ColumnDescriptor, SqlSession};
use crate::model::{BaseQuery, Collection};
use crate::sql::select_star_table;
use crate::Result;

static VIEW_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary view dropped when the guard goes out of scope
struct TempView<'a> {
    session: &'a dyn SqlSession,
    name: String,
}

impl<'a> TempView<'a> {
    fn create(session: &'a dyn SqlSession, name: String, sql: &str) -> Result<Self> {
        session.create_temp_view(&name, sql)?;
        Ok(Self { session, name })
    }
}

impl Drop for TempView<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.session.drop_view(&self.name) {
            log::warn!("failed to drop introspection view {}: {}", self.name, e);
        }
    }
}

/// Columns a collection's base query produces
///
/// A base query that is just `SELECT * FROM <table>` is described directly;
/// anything else goes through a throwaway temp view.
pub fn introspect(session: &dyn SqlSession, collection: &Collection) -> Result<Vec<ColumnDescriptor>> {
    let base_sql = collection.base_sql();

    let direct = match &collection.base {
        BaseQuery::Table(table) if !collection.materialized => Some(table.as_str()),
        _ => select_star_table(&base_sql),
    };
    if let Some(table) = direct {
        return session.describe(table);
    }

    let name = format!(
        "tabula_schema_{}_{}",
        collection.name,
        VIEW_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let view = TempView::create(session, name, base_sql.trim().trim_end_matches(';'))?;
    session.describe(&view.name)
}
