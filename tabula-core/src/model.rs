//! Collections and the registry they are looked up in
//!
//! A [`Collection`] is created from configuration at startup and never changes
//! while serving. Loading that configuration is the embedding application's
//! job; it hands the result over through [`CollectionRegistry`].

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::relations::Reference;
use crate::sql::{is_identifier, is_table_reference, select_star_table};
use crate::{Error, Result};

static REFERENCE_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*)\(([A-Za-z_][A-Za-z0-9_]*)\)$")
        .expect("valid reference regex")
});

/// Where a collection's rows come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseQuery {
    /// A table or view reference, optionally schema-qualified
    Table(String),
    /// Arbitrary SQL text
    Sql(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub group: String,
    pub name: String,
    pub base: BaseQuery,
    pub materialized: bool,
    pub primary_key: Vec<String>,
    pub references: Vec<Reference>,
}

impl Collection {
    /// Collection backed by a table reference
    pub fn table(group: impl Into<String>, name: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(group, name, BaseQuery::Table(table.into()))
    }

    /// Collection backed by SQL text
    pub fn sql(group: impl Into<String>, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(group, name, BaseQuery::Sql(sql.into()))
    }

    fn new(group: impl Into<String>, name: impl Into<String>, base: BaseQuery) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            base,
            materialized: false,
            primary_key: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn materialized(mut self, materialized: bool) -> Self {
        self.materialized = materialized;
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Declare `column → table(column)`; the target uses the reference token syntax
    pub fn reference(mut self, column: &str, spec: &str) -> Result<Self> {
        let reference = parse_reference(&self.table_name(), column, spec)?;
        self.references.push(reference);
        Ok(self)
    }

    /// Check identifiers so they can be interpolated into SQL later
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.name) {
            return Err(Error::Config(format!("invalid collection name {:?}", self.name)));
        }
        if let BaseQuery::Table(table) = &self.base {
            if !is_table_reference(table) {
                return Err(Error::Config(format!("invalid table reference {:?}", table)));
            }
        }
        if let Some(column) = self.primary_key.iter().find(|c| !is_identifier(c)) {
            return Err(Error::Config(format!("invalid primary key column {:?}", column)));
        }
        Ok(())
    }

    /// SQL every request on this collection starts from
    ///
    /// Materialized collections were loaded into a table named after the
    /// collection and are read from there instead of re-running the base query.
    pub fn base_sql(&self) -> String {
        if self.materialized {
            return format!("SELECT * FROM {}", self.name);
        }
        match &self.base {
            BaseQuery::Table(table) => format!("SELECT * FROM {}", table),
            BaseQuery::Sql(sql) => sql.clone(),
        }
    }

    /// Table joins and relationship discovery refer to
    pub fn table_name(&self) -> String {
        if self.materialized {
            return self.name.clone();
        }
        match &self.base {
            BaseQuery::Table(table) => table.clone(),
            BaseQuery::Sql(sql) => select_star_table(sql).unwrap_or(&self.name).to_string(),
        }
    }
}

/// Parse `[schema.]table(column)` into a `belongs_to` edge from `source_table.column`
pub fn parse_reference(source_table: &str, column: &str, spec: &str) -> Result<Reference> {
    if !is_identifier(column) {
        return Err(Error::bad_request(format!("invalid reference column {:?}", column)));
    }
    let captures = REFERENCE_SPEC
        .captures(spec.trim())
        .ok_or_else(|| Error::bad_request(format!("malformed reference {:?}", spec)))?;
    Ok(Reference::belongs_to(source_table, column, &captures[1], &captures[2]))
}

/// Lookup of configured collections
pub trait CollectionRegistry: Send + Sync {
    fn get(&self, group: &str, name: &str) -> Option<Arc<Collection>>;

    /// Every collection of a group, in declaration order
    fn collections(&self, group: &str) -> Vec<Arc<Collection>>;

    fn groups(&self) -> Vec<String>;
}

/// In-memory registry
#[derive(Debug, Clone, Default)]
pub struct CollectionCatalog {
    collections: Vec<Arc<Collection>>,
}

impl CollectionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection, replacing any previous one with the same identity
    pub fn register(&mut self, collection: Collection) -> Result<()> {
        collection.validate()?;
        self.collections.retain(|c| !(c.group == collection.group && c.name == collection.name));
        self.collections.push(Arc::new(collection));
        Ok(())
    }

    pub fn with(mut self, collection: Collection) -> Result<Self> {
        self.register(collection)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl CollectionRegistry for CollectionCatalog {
    fn get(&self, group: &str, name: &str) -> Option<Arc<Collection>> {
        let in_group = || self.collections.iter().filter(|c| c.group == group);
        in_group()
            .find(|c| c.name == name)
            .or_else(|| in_group().find(|c| c.name.eq_ignore_ascii_case(name)))
            .cloned()
    }

    fn collections(&self, group: &str) -> Vec<Arc<Collection>> {
        self.collections.iter().filter(|c| c.group == group).cloned().collect()
    }

    fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for collection in &self.collections {
            if !groups.contains(&collection.group) {
                groups.push(collection.group.clone());
            }
        }
        groups
    }
}
