//! Navigation edges between collections
//!
//! Edges come from three places, in order of precedence: references declared
//! on a collection, the backing engine's foreign-key catalog, and a heuristic
//! scan for `<x>_id` columns. Every forward (`belongs_to`) edge has a
//! reciprocal `has_many` edge on its target.

pub mod inflect;

use serde::{Deserialize, Serialize};

use crate::sql::strip_schema;
pub use inflect::{plural_pascal, pluralize, singular_pascal, singularize};

/// Which side of the edge holds the foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// The FK lives on the source table
    BelongsTo,
    /// The FK lives on the target table
    HasMany,
}

/// Directed edge `source.source_column → target.target_column`
///
/// The join condition is always `target.target_column = source.source_column`,
/// whichever side holds the foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub kind: RelationKind,
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl Reference {
    pub fn belongs_to(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::BelongsTo,
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
        }
    }

    /// The `has_many` edge walking this one backwards
    pub fn reciprocal(&self) -> Self {
        Self {
            kind: match self.kind {
                RelationKind::BelongsTo => RelationKind::HasMany,
                RelationKind::HasMany => RelationKind::BelongsTo,
            },
            source_table: self.target_table.clone(),
            source_column: self.target_column.clone(),
            target_table: self.source_table.clone(),
            target_column: self.source_column.clone(),
        }
    }

    /// `Customer` for `belongs_to customers`, `Orders` for `has_many orders`
    pub fn navigation_name(&self) -> String {
        let target = strip_schema(&self.target_table);
        match self.kind {
            RelationKind::BelongsTo => singular_pascal(target),
            RelationKind::HasMany => plural_pascal(target),
        }
    }

    /// Case-insensitive match of a requested navigation property against this edge
    pub fn matches_navigation(&self, name: &str) -> bool {
        let target = strip_schema(&self.target_table);
        let singular = singularize(target);
        [self.navigation_name(), target.to_string(), pluralize(&singular), singular]
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(name))
    }

    pub fn is_from(&self, table: &str) -> bool {
        same_table(&self.source_table, table)
    }
}

/// Table name equality ignoring case and schema qualifiers
pub fn same_table(a: &str, b: &str) -> bool {
    strip_schema(a).eq_ignore_ascii_case(strip_schema(b))
}

/// Column names of one known table, input to the heuristic scan
#[derive(Debug, Clone)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<String>,
}

/// Row of a foreign-key catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Discovered edges of a group of collections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipSet {
    pub forward: Vec<Reference>,
    pub reverse: Vec<Reference>,
}

impl RelationshipSet {
    /// Build from forward edges, adding reciprocals and dropping duplicates
    pub fn from_forward(edges: impl IntoIterator<Item = Reference>) -> Self {
        let mut forward: Vec<Reference> = Vec::new();
        for edge in edges {
            if !forward.contains(&edge) {
                forward.push(edge);
            }
        }
        let reverse = forward.iter().map(Reference::reciprocal).collect();
        Self { forward, reverse }
    }

    /// From a foreign-key catalog, keeping only edges between known tables
    pub fn from_catalog(foreign_keys: &[ForeignKey], known_tables: &[String]) -> Self {
        let known = |table: &str| known_tables.iter().find(|t| same_table(t, table));
        Self::from_forward(foreign_keys.iter().filter_map(|fk| {
            let source = known(&fk.table)?;
            let target = known(&fk.referenced_table)?;
            Some(Reference::belongs_to(
                source.clone(),
                fk.column.clone(),
                target.clone(),
                fk.referenced_column.clone(),
            ))
        }))
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }

    /// Every edge leaving `table`, forward edges first
    pub fn edges_from(&self, table: &str) -> Vec<&Reference> {
        self.forward.iter().chain(self.reverse.iter()).filter(|edge| edge.is_from(table)).collect()
    }
}

/// Heuristic scan: `<x>_id` points at the table named `<x>` or its plural/singular
pub fn discover_heuristic(tables: &[TableColumns]) -> RelationshipSet {
    let mut edges = Vec::new();

    for source in tables {
        for column in &source.columns {
            let lower = column.to_ascii_lowercase();
            if lower == "id" {
                continue;
            }
            let Some(stem) = lower.strip_suffix("_id") else {
                continue;
            };
            if stem.is_empty() {
                continue;
            }

            let candidates = [stem.to_string(), pluralize(stem), singularize(stem)];
            let target = tables.iter().find(|t| {
                !same_table(&t.table, &source.table)
                    && candidates.iter().any(|c| strip_schema(&t.table).eq_ignore_ascii_case(c))
            });

            if let Some(target) = target {
                edges.push(Reference::belongs_to(
                    source.table.clone(),
                    column.clone(),
                    target.table.clone(),
                    "id",
                ));
            }
        }
    }

    log::debug!("heuristic discovery found {} relationships", edges.len());
    RelationshipSet::from_forward(edges)
}

/// Find the edge a navigation property names
///
/// Declared references are consulted before discovered ones. `kinds` limits
/// which edge kinds may match.
pub fn resolve_navigation<'a>(
    table: &str,
    navigation: &str,
    declared: &'a [Reference],
    discovered: &'a RelationshipSet,
    kinds: &[RelationKind],
) -> Option<&'a Reference> {
    let allowed = |edge: &&Reference| kinds.contains(&edge.kind) && edge.matches_navigation(navigation);

    declared
        .iter()
        .filter(|edge| edge.is_from(table))
        .find(allowed)
        .or_else(|| {
            discovered
                .forward
                .iter()
                .chain(discovered.reverse.iter())
                .filter(|edge| edge.is_from(table))
                .find(allowed)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, columns: &[&str]) -> TableColumns {
        TableColumns {
            table: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn sample() -> Vec<TableColumns> {
        vec![
            table("customers", &["id", "name"]),
            table("orders", &["id", "customer_id", "total"]),
            table("order_items", &["id", "order_id", "product_id", "quantity"]),
            table("category", &["id", "name"]),
            table("products", &["id", "category_id", "name"]),
        ]
    }

    #[test]
    fn test_heuristic_discovery_matches_singular_and_plural() {
        let set = discover_heuristic(&sample());

        assert!(set.forward.contains(&Reference::belongs_to("orders", "customer_id", "customers", "id")));
        assert!(set.forward.contains(&Reference::belongs_to("order_items", "order_id", "orders", "id")));
        assert!(set.forward.contains(&Reference::belongs_to("order_items", "product_id", "products", "id")));
        assert!(set.forward.contains(&Reference::belongs_to("products", "category_id", "category", "id")));
        assert_eq!(set.forward.len(), 4);
        assert_eq!(set.reverse.len(), 4);
    }

    #[test]
    fn test_every_forward_edge_has_reciprocal() {
        let set = discover_heuristic(&sample());
        for edge in &set.forward {
            assert!(set.reverse.contains(&edge.reciprocal()));
        }
        let reverse = &set.reverse[0];
        assert_eq!(reverse.kind, RelationKind::HasMany);
    }

    #[test]
    fn test_unknown_targets_and_plain_id_are_ignored() {
        let set = discover_heuristic(&[table("events", &["id", "session_id", "_id"])]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_navigation_names() {
        let edge = Reference::belongs_to("orders", "customer_id", "main.customers", "id");
        assert_eq!(edge.navigation_name(), "Customer");
        assert_eq!(edge.reciprocal().navigation_name(), "Orders");
        assert!(edge.matches_navigation("customer"));
        assert!(edge.matches_navigation("Customers"));
        assert!(!edge.matches_navigation("Orders"));
    }

    #[test]
    fn test_declared_references_win() {
        let set = discover_heuristic(&sample());
        let declared = vec![Reference::belongs_to("orders", "billing_customer_id", "customers", "id")];

        let edge = resolve_navigation("orders", "Customer", &declared, &set, &[RelationKind::BelongsTo])
            .unwrap();
        assert_eq!(edge.source_column, "billing_customer_id");

        let edge = resolve_navigation("orders", "customer", &[], &set, &[RelationKind::BelongsTo]).unwrap();
        assert_eq!(edge.source_column, "customer_id");

        assert!(resolve_navigation("orders", "Customer", &[], &set, &[RelationKind::HasMany]).is_none());
        assert!(resolve_navigation("orders", "Nope", &[], &set, &[RelationKind::BelongsTo]).is_none());
    }

    #[test]
    fn test_catalog_keeps_known_tables_only() {
        let fks = vec![
            ForeignKey {
                table: "orders".into(),
                column: "customer_id".into(),
                referenced_table: "customers".into(),
                referenced_column: "id".into(),
            },
            ForeignKey {
                table: "orders".into(),
                column: "region_id".into(),
                referenced_table: "regions".into(),
                referenced_column: "id".into(),
            },
        ];
        let set = RelationshipSet::from_catalog(&fks, &["orders".into(), "customers".into()]);
        assert_eq!(set.forward.len(), 1);
        assert_eq!(set.reverse[0].source_table, "customers");
        assert_eq!(set.reverse[0].target_column, "customer_id");
    }
}
