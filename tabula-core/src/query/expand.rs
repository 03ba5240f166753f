//! `$expand` resolution
//!
//! Only `belongs_to` edges are expanded inline: they add at most one related
//! row per primary row, so the LEFT JOIN never multiplies or drops rows.
//! Requesting a `has_many` edge is a bad request; those are reached through
//! navigation paths instead.

use crate::model::Collection;
use crate::relations::{resolve_navigation, Reference, RelationKind, RelationshipSet};
use crate::sql::is_identifier;
use crate::{Error, Result};

/// Alias of the wrapped primary query inside the expand stage
pub const BASE_ALIAS: &str = "base_data";

/// One navigation property joined into the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Key the related entity is nested under, e.g. `Customer`
    pub navigation: String,
    /// Join alias, the lowercase navigation name
    pub alias: String,
    pub reference: Reference,
    /// `(projected column, target column)` pairs in target column order
    pub columns: Vec<(String, String)>,
}

impl Expansion {
    pub fn projected_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(projected, _)| projected.as_str())
    }

    /// `alias.column AS projected` items for the expand stage
    pub fn select_items(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|(projected, column)| format!("{}.{} AS {}", self.alias, column, projected))
            .collect()
    }

    pub fn join_condition(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            self.alias, self.reference.target_column, BASE_ALIAS, self.reference.source_column
        )
    }
}

fn unique_name(candidate: String, taken: &[String]) -> String {
    let clashes = |name: &str| taken.iter().any(|t| t.eq_ignore_ascii_case(name));
    if !clashes(&candidate) {
        return candidate;
    }
    let mut n = 1;
    loop {
        let name = format!("{}_{}", candidate, n);
        if !clashes(&name) {
            return name;
        }
        n += 1;
    }
}

/// Resolve requested navigation names against declared then discovered edges
///
/// Unknown names are skipped and `has_many` edges are rejected. `target_columns` supplies
/// the columns of an edge's target table. Projected names are
/// `{alias}_{column}`, suffixed when they would collide with `base_columns`.
pub fn resolve_expansions<F>(
    collection: &Collection,
    requested: &[String],
    discovered: &RelationshipSet,
    base_columns: &[String],
    mut target_columns: F,
) -> Result<Vec<Expansion>>
where
    F: FnMut(&Reference) -> Result<Vec<String>>,
{
    let table = collection.table_name();
    let mut expansions: Vec<Expansion> = Vec::new();
    let mut taken_aliases = vec![BASE_ALIAS.to_string()];
    let mut taken_columns: Vec<String> = base_columns.to_vec();

    for name in requested {
        let Some(edge) = resolve_navigation(
            &table,
            name,
            &collection.references,
            discovered,
            &[RelationKind::BelongsTo, RelationKind::HasMany],
        ) else {
            log::debug!("$expand: no navigation property {:?} on {}", name, collection.name);
            continue;
        };

        if edge.kind == RelationKind::HasMany {
            return Err(Error::bad_request(format!(
                "$expand of collection-valued navigation property {} is not supported; use {}(key)/{}",
                name, collection.name, edge.navigation_name()
            )));
        }
        if expansions.iter().any(|e| &e.reference == edge) {
            continue;
        }

        let navigation = edge.navigation_name();
        let alias = unique_name(navigation.to_lowercase(), &taken_aliases);
        taken_aliases.push(alias.clone());

        let mut columns = Vec::new();
        for column in target_columns(edge)? {
            if !is_identifier(&column) {
                log::debug!("$expand: cannot project column {:?} of {}", column, edge.target_table);
                continue;
            }
            let projected = unique_name(format!("{}_{}", alias, column), &taken_columns);
            taken_columns.push(projected.clone());
            columns.push((projected, column));
        }

        expansions.push(Expansion { navigation, alias, reference: edge.clone(), columns });
    }

    Ok(expansions)
}
