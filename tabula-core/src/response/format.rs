//! Rows to OData JSON entities

use serde_json::{Map, Value};

use crate::query::Expansion;
use crate::value::CellValue;

/// Zip column names with one row into an entity, nesting expanded columns
///
/// Columns projected by an expansion move under the expansion's navigation
/// name with the projection prefix stripped. A related entity whose columns
/// are all null (no match for the LEFT JOIN) becomes `null`; an expansion
/// whose columns are absent from the result is omitted.
pub fn format_row(columns: &[String], row: Vec<CellValue>, expansions: &[Expansion]) -> Map<String, Value> {
    let claimed = |name: &str| {
        expansions.iter().find_map(|e| {
            e.columns
                .iter()
                .position(|(projected, _)| projected == name)
                .map(|idx| (e.navigation.as_str(), idx))
        })
    };

    let mut entity = Map::new();
    let mut nested: Vec<(&str, Vec<(usize, Value)>)> = Vec::new();

    for (name, value) in columns.iter().zip(row) {
        match claimed(name) {
            Some((navigation, idx)) => {
                let json = value.to_json();
                match nested.iter_mut().find(|(nav, _)| *nav == navigation) {
                    Some((_, fields)) => fields.push((idx, json)),
                    None => nested.push((navigation, vec![(idx, json)])),
                }
            }
            None => {
                entity.insert(name.clone(), value.to_json());
            }
        }
    }

    for expansion in expansions {
        let Some((_, fields)) = nested.iter().find(|(nav, _)| *nav == expansion.navigation) else {
            continue;
        };
        if fields.iter().all(|(_, v)| v.is_null()) {
            entity.insert(expansion.navigation.clone(), Value::Null);
            continue;
        }
        let mut related = Map::new();
        for (idx, value) in fields {
            related.insert(expansion.columns[*idx].1.clone(), value.clone());
        }
        entity.insert(expansion.navigation.clone(), Value::Object(related));
    }

    entity
}

/// Format every row of a result
pub fn format_rows(columns: &[String], rows: Vec<Vec<CellValue>>, expansions: &[Expansion]) -> Vec<Value> {
    rows.into_iter().map(|row| Value::Object(format_row(columns, row, expansions))).collect()
}

/// `{group_url}/$metadata#{entity_set}`, with `(a,b)` when `$select` is present
pub fn context_url(group_url: &str, entity_set: &str, select: &[String]) -> String {
    let selected: Vec<&str> = select.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if selected.is_empty() {
        format!("{}/$metadata#{}", group_url, entity_set)
    } else {
        format!("{}/$metadata#{}({})", group_url, entity_set, selected.join(","))
    }
}

/// Context URL of a single entity
pub fn entity_context_url(group_url: &str, entity_set: &str) -> String {
    format!("{}/$metadata#{}/$entity", group_url, entity_set)
}

/// `{"@odata.context"?, "value", "@odata.nextLink"?, "@odata.count"?}`
pub fn collection_envelope(
    context: Option<String>,
    value: Vec<Value>,
    next_link: Option<String>,
    count: Option<u64>,
) -> Value {
    let mut envelope = Map::new();
    if let Some(context) = context {
        envelope.insert("@odata.context".to_string(), Value::String(context));
    }
    envelope.insert("value".to_string(), Value::Array(value));
    if let Some(link) = next_link {
        envelope.insert("@odata.nextLink".to_string(), Value::String(link));
    }
    if let Some(count) = count {
        envelope.insert("@odata.count".to_string(), Value::from(count));
    }
    Value::Object(envelope)
}

/// Entity fields preceded by `@odata.context`
pub fn entity_envelope(context: Option<String>, entity: Map<String, Value>) -> Value {
    let mut envelope = Map::with_capacity(entity.len() + 1);
    if let Some(context) = context {
        envelope.insert("@odata.context".to_string(), Value::String(context));
    }
    envelope.extend(entity);
    Value::Object(envelope)
}
