//! Collection declarations read from a TOML file
//!
//! ```toml
//! [[collection]]
//! group = "sales"
//! name = "orders"
//! table = "orders"
//! primary_key = ["id"]
//!
//! [collection.references]
//! customer_id = "customers(id)"
//!
//! [[collection]]
//! group = "sales"
//! name = "big_orders"
//! sql = "SELECT * FROM orders WHERE total > 100"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tabula_core::{Collection, CollectionCatalog};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CollectionsFile {
    #[serde(default)]
    collection: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CollectionEntry {
    group: String,
    name: String,
    table: Option<String>,
    sql: Option<String>,
    #[serde(default)]
    materialized: bool,
    #[serde(default)]
    primary_key: Vec<String>,
    /// Source column to `[schema.]table(column)`
    #[serde(default)]
    references: BTreeMap<String, String>,
}

impl CollectionEntry {
    fn into_collection(self) -> Result<Collection> {
        let collection = match (self.table, self.sql) {
            (Some(table), None) => Collection::table(&self.group, &self.name, table),
            (None, Some(sql)) => Collection::sql(&self.group, &self.name, sql),
            _ => bail!("collection {}/{} needs exactly one of `table` or `sql`", self.group, self.name),
        };

        let mut collection = collection.materialized(self.materialized).primary_key(self.primary_key);
        for (column, target) in &self.references {
            collection = collection
                .reference(column, target)
                .with_context(|| format!("reference {} of {}/{}", column, self.group, self.name))?;
        }
        Ok(collection)
    }
}

pub fn parse(content: &str) -> Result<CollectionCatalog> {
    let file: CollectionsFile = toml::from_str(content)?;
    let mut catalog = CollectionCatalog::new();
    for entry in file.collection {
        catalog.register(entry.into_collection()?)?;
    }
    Ok(catalog)
}

pub fn load(path: &Path) -> Result<CollectionCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read collections file: {}", path.display()))?;
    let catalog =
        parse(&content).with_context(|| format!("Failed to parse collections file: {}", path.display()))?;
    log::info!("loaded {} collections from {}", catalog.len(), path.display());
    Ok(catalog)
}
