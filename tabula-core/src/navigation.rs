//! Key-based addressing: `collection(key)` and `collection(key)/Navigation`

use std::sync::LazyLock;

use regex::Regex;

use crate::engine::ResultSet;
use crate::model::Collection;
use crate::relations::{resolve_navigation, Reference, RelationKind, RelationshipSet};
use crate::sql::{is_identifier, quote_literal, JoinKind, SelectStage, Source, Sql};
use crate::{Error, Result};

static ENTITY_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\(([^)]+)\)$").expect("valid entity path regex")
});

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("valid integer regex"));

/// Entity key literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    Integer(String),
    String(String),
}

impl KeyValue {
    /// `42`, `'O''Brien'`, `id=42` or a bare word (read as a string)
    pub fn parse(raw: &str) -> Result<Self> {
        let mut raw = raw.trim();
        if let Some((name, value)) = raw.split_once('=') {
            if is_identifier(name.trim()) {
                raw = value.trim();
            }
        }

        if INTEGER.is_match(raw) {
            return Ok(KeyValue::Integer(raw.to_string()));
        }
        if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
            let inner = &raw[1..raw.len() - 1];
            if inner.replace("''", "").contains('\'') {
                return Err(Error::bad_request(format!("malformed key literal {}", raw)));
            }
            return Ok(KeyValue::String(inner.replace("''", "'")));
        }
        if raw.is_empty() || raw.contains('\'') {
            return Err(Error::bad_request(format!("malformed key literal {:?}", raw)));
        }
        Ok(KeyValue::String(raw.to_string()))
    }

    pub fn to_sql(&self) -> String {
        match self {
            KeyValue::Integer(n) => n.clone(),
            KeyValue::String(s) => quote_literal(s),
        }
    }
}

/// A parsed `collection(key)` path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPath {
    pub collection: String,
    pub key: KeyValue,
}

impl EntityPath {
    pub fn parse(segment: &str) -> Result<Self> {
        let captures = ENTITY_PATH
            .captures(segment.trim())
            .ok_or_else(|| Error::bad_request(format!("malformed entity path {:?}", segment)))?;
        Ok(Self { collection: captures[1].to_string(), key: KeyValue::parse(&captures[2])? })
    }

    /// Split `collection(key)/Navigation` into the entity path and navigation name
    pub fn parse_with_navigation(path: &str) -> Result<(Self, Option<String>)> {
        let path = path.trim().trim_matches('/');
        match path.rsplit_once('/') {
            Some((entity, navigation)) if !navigation.is_empty() => {
                Ok((Self::parse(entity)?, Some(navigation.to_string())))
            }
            _ => Ok((Self::parse(path)?, None)),
        }
    }
}

/// `SELECT * FROM (<base>) AS entity_data WHERE <key column> = <key>`
///
/// `key_column` comes from [`crate::metadata::key_column`] so entity lookups
/// use the same key the metadata document declares.
pub fn entity_sql(collection: &Collection, key_column: &str, key: &KeyValue) -> String {
    Sql::raw(collection.base_sql())
        .wrap("entity_data")
        .filter(format!("{} = {}", key_column, key.to_sql()))
        .render()
}

/// Edge a navigation property names, declared references first
pub fn resolve<'a>(
    collection: &'a Collection,
    navigation: &str,
    discovered: &'a RelationshipSet,
) -> Result<&'a Reference> {
    resolve_navigation(
        &collection.table_name(),
        navigation,
        &collection.references,
        discovered,
        &[RelationKind::BelongsTo, RelationKind::HasMany],
    )
    .ok_or_else(|| {
        Error::not_found(format!(
            "navigation property {} not found on {}",
            navigation, collection.name
        ))
    })
}

/// Rows of the edge's target related to the source entity with `key`
pub fn navigation_sql(source: &Collection, key_column: &str, edge: &Reference, key: &KeyValue) -> String {
    SelectStage::from(Source::aliased_table(&edge.target_table, "target"))
        .columns(["target.*"])
        .join(
            JoinKind::Inner,
            Source::subquery(Sql::raw(source.base_sql()), "source_data"),
            format!("target.{} = source_data.{}", edge.target_column, edge.source_column),
        )
        .filter(format!("source_data.{} = {}", key_column, key.to_sql()))
        .render()
}

/// Shape of a key-addressed result
#[derive(Debug, Clone, PartialEq)]
pub enum Addressed {
    Single(ResultSet),
    Many(ResultSet),
}

/// No rows is a 404, one row a single entity, more rows a collection
pub fn classify(rows: ResultSet, what: impl FnOnce() -> String) -> Result<Addressed> {
    match rows.len() {
        0 => Err(Error::not_found(what())),
        1 => Ok(Addressed::Single(rows)),
        _ => Ok(Addressed::Many(rows)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ColumnDescriptor;
    use crate::relations::discover_heuristic;
    use crate::relations::TableColumns;
    use crate::value::CellValue;

    #[test]
    fn test_key_literals() {
        assert_eq!(KeyValue::parse("42").unwrap(), KeyValue::Integer("42".into()));
        assert_eq!(KeyValue::parse("'O''Brien'").unwrap(), KeyValue::String("O'Brien".into()));
        assert_eq!(KeyValue::parse("id=7").unwrap(), KeyValue::Integer("7".into()));
        assert_eq!(KeyValue::parse("ALFKI").unwrap(), KeyValue::String("ALFKI".into()));
        assert_eq!(KeyValue::parse("'O''Brien'").unwrap().to_sql(), "'O''Brien'");
        assert!(KeyValue::parse("'a'b'").is_err());
        assert!(KeyValue::parse("x' OR '1").is_err());
    }

    #[test]
    fn test_entity_path_parsing() {
        let (path, nav) = EntityPath::parse_with_navigation("customers(5)/Orders").unwrap();
        assert_eq!(path.collection, "customers");
        assert_eq!(path.key, KeyValue::Integer("5".into()));
        assert_eq!(nav.as_deref(), Some("Orders"));

        let (_, nav) = EntityPath::parse_with_navigation("customers('a')").unwrap();
        assert!(nav.is_none());

        assert!(matches!(EntityPath::parse("customers"), Err(Error::BadRequest(_))));
        assert!(matches!(EntityPath::parse("1customers(1)"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_navigation_sql_uses_inner_join() {
        let orders = Collection::table("sales", "orders", "orders");
        let edge = Reference::belongs_to("orders", "customer_id", "customers", "id");
        assert_eq!(
            navigation_sql(&orders, "id", &edge, &KeyValue::Integer("3".into())),
            "SELECT target.* FROM customers AS target INNER JOIN (SELECT * FROM orders) AS source_data \
             ON target.id = source_data.customer_id WHERE source_data.id = 3"
        );

        let customers = Collection::table("sales", "customers", "customers");
        assert_eq!(
            navigation_sql(&customers, "code", &edge.reciprocal(), &KeyValue::String("x".into())),
            "SELECT target.* FROM orders AS target INNER JOIN (SELECT * FROM customers) AS source_data \
             ON target.customer_id = source_data.id WHERE source_data.code = 'x'"
        );
    }

    #[test]
    fn test_entity_sql_uses_given_key_column() {
        let c = Collection::sql("sales", "products", "SELECT sku, qty FROM stock");
        assert_eq!(
            entity_sql(&c, "sku", &KeyValue::String("A-1".into())),
            "SELECT * FROM (SELECT sku, qty FROM stock) AS entity_data WHERE sku = 'A-1'"
        );
    }

    #[test]
    fn test_unknown_navigation_is_not_found() {
        let customers = Collection::table("sales", "customers", "customers");
        let set = discover_heuristic(&[
            TableColumns { table: "customers".into(), columns: vec!["id".into()] },
            TableColumns { table: "orders".into(), columns: vec!["id".into(), "customer_id".into()] },
        ]);
        assert_eq!(resolve(&customers, "Orders", &set).unwrap().kind, RelationKind::HasMany);
        assert!(matches!(resolve(&customers, "Invoices", &set), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_classify_by_row_count() {
        let mut rows = ResultSet { columns: vec![ColumnDescriptor::new("id", "")], rows: vec![] };
        assert!(matches!(classify(rows.clone(), || "gone".into()), Err(Error::NotFound(_))));
        rows.rows.push(vec![CellValue::Int(1)]);
        assert!(matches!(classify(rows.clone(), String::new), Ok(Addressed::Single(_))));
        rows.rows.push(vec![CellValue::Int(2)]);
        assert!(matches!(classify(rows, String::new), Ok(Addressed::Many(_))));
    }
}
