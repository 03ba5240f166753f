//! Server-driven paging and `$count`

use serde_json::Value;

use crate::config::{NextLinkMode, ParsePolicy};
use crate::engine::SqlSession;
use crate::model::Collection;
use crate::query::{build_count_query, PageRequest, QueryParams};
use crate::value::CellValue;

/// `$count` is honoured only for the exact string `"true"` or a JSON `true`
pub fn should_include_count(param: &Value) -> bool {
    match param {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

/// Trim an over-fetched page to `top` rows, reporting whether more exist
///
/// A `top` of zero always yields an empty, final page.
pub fn detect_more<T>(mut rows: Vec<T>, top: u64) -> (Vec<T>, bool) {
    let top = usize::try_from(top).unwrap_or(usize::MAX);
    if rows.len() > top {
        rows.truncate(top);
        (rows, top > 0)
    } else {
        (rows, false)
    }
}

/// Whether `@odata.nextLink` is emitted for this page
pub fn include_next_link(mode: NextLinkMode, page: &PageRequest, more: bool) -> bool {
    match mode {
        NextLinkMode::ServerDriven => more,
        NextLinkMode::Lazy => more && page.explicit,
    }
}

/// `{collection_url}?{original params}&$skip={skip+top}&$top={top}`
pub fn build_next_link(collection_url: &str, params: &QueryParams, page: &PageRequest) -> String {
    let next = params
        .without(&["$skip", "$top"])
        .with("$skip", page.skip.saturating_add(page.top).to_string())
        .with("$top", page.top.to_string());
    format!("{}?{}", collection_url, next.to_query_string())
}

/// Rows matching the base query and `$filter`; 0 when the count itself fails
pub fn total_count(
    session: &dyn SqlSession,
    collection: &Collection,
    filter: Option<&str>,
    filter_policy: ParsePolicy,
) -> u64 {
    let result = build_count_query(collection, filter, filter_policy)
        .and_then(|sql| session.execute(&sql));

    match result {
        Ok(rs) => match rs.rows.first().and_then(|row| row.first()) {
            Some(CellValue::Int(n)) => u64::try_from(*n).unwrap_or(0),
            other => {
                log::warn!("unexpected count result for {}: {:?}", collection.name, other);
                0
            }
        },
        Err(e) => {
            log::warn!("count query for {}/{} failed: {}", collection.group, collection.name, e);
            0
        }
    }
}
