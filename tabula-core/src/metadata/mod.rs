//! CSDL `$metadata` document
//!
//! One schema per service, one entity type and entity set per collection.
//! Struct-typed columns are lifted into shared complex types, and every
//! relationship whose target is a known entity set becomes a navigation
//! property with a matching binding in the entity container.

pub mod edm;

pub use edm::{edm_type, ColumnShape};

use std::fmt::Write as _;

use heck::ToUpperCamelCase;

use crate::config::ServiceConfig;
use crate::engine::ColumnDescriptor;
use crate::model::Collection;
use crate::relations::{same_table, singular_pascal, Reference, RelationKind, RelationshipSet};

/// A collection together with its introspected columns
#[derive(Debug, Clone)]
pub struct EntitySetSchema<'a> {
    pub collection: &'a Collection,
    pub columns: &'a [ColumnDescriptor],
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Property {
    name: String,
    type_name: String,
    nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexType {
    name: String,
    properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NavigationProperty {
    name: String,
    type_name: String,
    target_set: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EntityType {
    name: String,
    set_name: String,
    key: Option<String>,
    properties: Vec<Property>,
    navigations: Vec<NavigationProperty>,
}

/// Entity type name of a collection: `customers` → `Customer`
pub fn entity_type_name(collection: &Collection) -> String {
    singular_pascal(&collection.name)
}

/// Key column: declared primary key, else the first `id` column, else the first column
pub fn key_column<'a>(collection: &Collection, columns: &'a [ColumnDescriptor]) -> Option<&'a str> {
    let declared = collection
        .primary_key
        .first()
        .and_then(|pk| columns.iter().find(|c| c.name.eq_ignore_ascii_case(pk)));
    declared
        .or_else(|| columns.iter().find(|c| c.name.eq_ignore_ascii_case("id")))
        .or_else(|| columns.first())
        .map(|c| c.name.as_str())
}

struct Builder<'a> {
    namespace: &'a str,
    complex_types: Vec<ComplexType>,
}

impl Builder<'_> {
    fn qualified(&self, name: &str) -> String {
        format!("{}.{}", self.namespace, name)
    }

    /// Type reference for a shape, declaring complex types on the way
    fn type_name(&mut self, shape: &ColumnShape, hint: &str) -> String {
        match shape {
            ColumnShape::Scalar(declared) => edm_type(declared).to_string(),
            ColumnShape::List(element) => format!("Collection({})", self.type_name(element, hint)),
            ColumnShape::Struct(fields) => {
                let properties: Vec<Property> = fields
                    .iter()
                    .map(|(name, shape)| Property {
                        name: name.clone(),
                        type_name: self
                            .type_name(shape, &format!("{}{}", hint, name.to_upper_camel_case())),
                        nullable: true,
                    })
                    .collect();

                let name = match self.complex_types.iter().find(|ct| ct.properties == properties) {
                    Some(existing) => existing.name.clone(),
                    None => {
                        let name = self.unique_complex_name(hint);
                        self.complex_types.push(ComplexType { name: name.clone(), properties });
                        name
                    }
                };
                self.qualified(&name)
            }
        }
    }

    fn unique_complex_name(&self, hint: &str) -> String {
        let taken = |name: &str| self.complex_types.iter().any(|ct| ct.name == name);
        if !taken(hint) {
            return hint.to_string();
        }
        let mut n = 2;
        while taken(&format!("{}{}", hint, n)) {
            n += 1;
        }
        format!("{}{}", hint, n)
    }
}

fn navigations(
    set: &EntitySetSchema<'_>,
    sets: &[EntitySetSchema<'_>],
    discovered: &RelationshipSet,
    namespace: &str,
) -> Vec<NavigationProperty> {
    let table = set.collection.table_name();
    let declared = set.collection.references.iter().filter(|edge| edge.is_from(&table));
    let declared_reciprocals: Vec<Reference> = sets
        .iter()
        .flat_map(|other| other.collection.references.iter())
        .filter(|edge| same_table(&edge.target_table, &table))
        .map(Reference::reciprocal)
        .collect();

    let mut out: Vec<NavigationProperty> = Vec::new();
    let edges = declared
        .chain(declared_reciprocals.iter())
        .chain(discovered.edges_from(&table));

    for edge in edges {
        let Some(target) = sets
            .iter()
            .find(|s| same_table(&s.collection.table_name(), &edge.target_table))
        else {
            continue;
        };
        let name = edge.navigation_name();
        if out.iter().any(|nav| nav.name == name) {
            continue;
        }
        let target_type = format!("{}.{}", namespace, entity_type_name(target.collection));
        let type_name = match edge.kind {
            RelationKind::BelongsTo => target_type,
            RelationKind::HasMany => format!("Collection({})", target_type),
        };
        out.push(NavigationProperty { name, type_name, target_set: target.collection.name.clone() });
    }
    out
}

/// Build the compact CSDL document for one group's entity sets
pub fn generate(config: &ServiceConfig, sets: &[EntitySetSchema<'_>], discovered: &RelationshipSet) -> String {
    let mut builder = Builder { namespace: &config.namespace, complex_types: Vec::new() };

    let entity_types: Vec<EntityType> = sets
        .iter()
        .map(|set| {
            let type_name = entity_type_name(set.collection);
            let key = key_column(set.collection, set.columns).map(String::from);
            let properties = set
                .columns
                .iter()
                .map(|column| {
                    let hint = format!("{}{}", type_name, column.name.to_upper_camel_case());
                    let is_key = key.as_deref() == Some(column.name.as_str());
                    Property {
                        name: column.name.clone(),
                        type_name: builder.type_name(&ColumnShape::parse(&column.data_type), &hint),
                        nullable: !is_key,
                    }
                })
                .collect();

            EntityType {
                name: type_name,
                set_name: set.collection.name.clone(),
                key,
                properties,
                navigations: navigations(set, sets, discovered, &config.namespace),
            }
        })
        .collect();

    render(config, &builder.complex_types, &entity_types)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_property(out: &mut String, property: &Property) {
    let _ = write!(
        out,
        "<Property Name=\"{}\" Type=\"{}\"",
        escape(&property.name),
        escape(&property.type_name)
    );
    if !property.nullable {
        out.push_str(" Nullable=\"false\"");
    }
    out.push_str("/>");
}

fn render(config: &ServiceConfig, complex_types: &[ComplexType], entity_types: &[EntityType]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <edmx:Edmx xmlns:edmx=\"http://docs.oasis-open.org/odata/ns/edmx\" Version=\"4.0\">\
         <edmx:DataServices>",
    );
    let _ = write!(
        out,
        "<Schema xmlns=\"http://docs.oasis-open.org/odata/ns/edm\" Namespace=\"{}\">",
        escape(&config.namespace)
    );

    for complex in complex_types {
        let _ = write!(out, "<ComplexType Name=\"{}\">", escape(&complex.name));
        for property in &complex.properties {
            render_property(&mut out, property);
        }
        out.push_str("</ComplexType>");
    }

    for entity in entity_types {
        let _ = write!(out, "<EntityType Name=\"{}\">", escape(&entity.name));
        if let Some(key) = &entity.key {
            let _ = write!(out, "<Key><PropertyRef Name=\"{}\"/></Key>", escape(key));
        }
        for property in &entity.properties {
            render_property(&mut out, property);
        }
        for nav in &entity.navigations {
            let _ = write!(
                out,
                "<NavigationProperty Name=\"{}\" Type=\"{}\" Nullable=\"true\"/>",
                escape(&nav.name),
                escape(&nav.type_name)
            );
        }
        out.push_str("</EntityType>");
    }

    let _ = write!(out, "<EntityContainer Name=\"{}\">", escape(&config.container_name));
    for entity in entity_types {
        let _ = write!(
            out,
            "<EntitySet Name=\"{}\" EntityType=\"{}.{}\">",
            escape(&entity.set_name),
            escape(&config.namespace),
            escape(&entity.name)
        );
        for nav in &entity.navigations {
            let _ = write!(
                out,
                "<NavigationPropertyBinding Path=\"{}\" Target=\"{}\"/>",
                escape(&nav.name),
                escape(&nav.target_set)
            );
        }
        out.push_str("</EntitySet>");
    }
    out.push_str("</EntityContainer></Schema></edmx:DataServices></edmx:Edmx>");
    out
}
