//! System query options of one request

use serde_json::Value;

use crate::config::{ParsePolicy, QueryConfig};
use crate::pagination::should_include_count;
use crate::query::QueryParams;
use crate::sql::{is_identifier, is_qualified_column, OrderTerm, SortDirection};
use crate::{Error, Result};

/// Requested page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: u64,
    pub top: u64,
    /// Whether the request itself carried `$top` or `$skip`
    pub explicit: bool,
}

impl PageRequest {
    /// Rows to fetch: one extra to detect a following page
    pub fn fetch_limit(&self) -> u64 {
        self.top.saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub filter: Option<String>,
    pub expand: Vec<String>,
    pub select: Vec<String>,
    pub order_by: Vec<OrderTerm>,
    pub page: PageRequest,
    pub count: bool,
}

impl QueryOptions {
    /// Read `$filter`, `$expand`, `$select`, `$orderby`, `$top`, `$skip`, `$count`
    pub fn from_params(params: &QueryParams, config: &QueryConfig) -> Result<Self> {
        let policy = config.parameter_policy;

        let select = split_list(params.get("$select"));
        if let Some(bad) = select.iter().find(|c| !is_qualified_column(c)) {
            return Err(Error::bad_request(format!("invalid $select column {:?}", bad)));
        }

        Ok(Self {
            filter: params.get("$filter").map(str::trim).filter(|f| !f.is_empty()).map(String::from),
            expand: parse_expand(params.get("$expand")),
            select,
            order_by: params.get("$orderby").map(parse_order_by).unwrap_or_default(),
            page: parse_page(params, config)?,
            count: parse_count(params.get("$count"), policy)?,
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Navigation names of `$expand`; nested options such as `Customer($select=name)` are ignored
fn parse_expand(raw: Option<&str>) -> Vec<String> {
    split_list(raw)
        .into_iter()
        .filter_map(|item| {
            let name = item.split('(').next().unwrap_or_default().trim().to_string();
            if is_identifier(&name) {
                Some(name)
            } else {
                log::debug!("skipping malformed $expand item {:?}", item);
                None
            }
        })
        .collect()
}

/// `column [asc|desc]` terms
///
/// A term with an invalid column is dropped. An invalid direction keyword is
/// dropped on its own and the column sorts ascending; words after the
/// direction are ignored.
pub fn parse_order_by(raw: &str) -> Vec<OrderTerm> {
    raw.split(',')
        .filter_map(|term| {
            let mut words = term.split_whitespace();
            let column = words.next()?;
            if !is_qualified_column(column) {
                log::debug!("dropping $orderby term with invalid column {:?}", column);
                return None;
            }
            let direction = words
                .next()
                .and_then(|keyword| {
                    let direction = SortDirection::parse(keyword);
                    if direction.is_none() {
                        log::debug!("dropping $orderby direction {:?} of {}", keyword, column);
                    }
                    direction
                })
                .unwrap_or(SortDirection::Asc);
            if words.next().is_some() {
                log::debug!("ignoring trailing words in $orderby term {:?}", term);
            }
            Some(OrderTerm { column: column.to_string(), direction })
        })
        .collect()
}

fn parse_integer(name: &str, raw: Option<&str>, policy: ParsePolicy) -> Result<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(n) => Ok(Some(n)),
        Err(_) if policy.is_lenient() => {
            log::warn!("ignoring invalid {} value {:?}", name, raw);
            Ok(None)
        }
        Err(_) => Err(Error::bad_request(format!("invalid {} value {:?}", name, raw))),
    }
}

fn parse_page(params: &QueryParams, config: &QueryConfig) -> Result<PageRequest> {
    let policy = config.parameter_policy;
    let explicit = params.contains("$top") || params.contains("$skip");

    let skip = parse_integer("$skip", params.get("$skip"), policy)?.unwrap_or(0).max(0) as u64;

    let top = match parse_integer("$top", params.get("$top"), policy)? {
        Some(n) if n < 0 && !policy.is_lenient() => {
            return Err(Error::bad_request(format!("invalid $top value {:?}", n)));
        }
        Some(n) if n < 0 => config.default_page_size,
        Some(n) => (n as u64).min(config.max_page_size),
        None => config.default_page_size,
    };

    Ok(PageRequest { skip, top, explicit })
}

fn parse_count(raw: Option<&str>, policy: ParsePolicy) -> Result<bool> {
    match raw {
        None | Some("false") => Ok(false),
        Some(flag) if should_include_count(&Value::from(flag)) => Ok(true),
        Some(other) if policy.is_lenient() => {
            log::warn!("ignoring invalid $count value {:?}", other);
            Ok(false)
        }
        Some(other) => Err(Error::bad_request(format!("invalid $count value {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(query: &str) -> Result<QueryOptions> {
        QueryOptions::from_params(&QueryParams::parse(query), &QueryConfig::default())
    }

    fn lenient(query: &str) -> QueryOptions {
        let config = QueryConfig::default().with_parameter_policy(ParsePolicy::Ignore);
        QueryOptions::from_params(&QueryParams::parse(query), &config).unwrap()
    }

    #[test]
    fn test_defaults() {
        let o = options("").unwrap();
        assert_eq!(o.page, PageRequest { skip: 0, top: 100, explicit: false });
        assert!(!o.count);
        assert!(o.filter.is_none());
        assert!(o.select.is_empty());
    }

    #[test]
    fn test_top_is_clamped_and_skip_floored() {
        let o = options("$top=5000&$skip=-3").unwrap();
        assert_eq!(o.page, PageRequest { skip: 0, top: 1000, explicit: true });
        assert_eq!(o.page.fetch_limit(), 1001);
    }

    #[test]
    fn test_invalid_literals_are_rejected_by_default() {
        assert!(matches!(options("$top=abc"), Err(Error::BadRequest(_))));
        assert!(matches!(options("$skip=1.5"), Err(Error::BadRequest(_))));
        assert!(matches!(options("$top=-1"), Err(Error::BadRequest(_))));
        assert!(matches!(options("$count=TRUE"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_lenient_policy_falls_back_to_defaults() {
        let o = lenient("$top=abc&$skip=x&$count=yes");
        assert_eq!(o.page.top, 100);
        assert_eq!(o.page.skip, 0);
        assert!(!o.count);
    }

    #[test]
    fn test_count_is_case_sensitive() {
        assert!(options("$count=true").unwrap().count);
        assert!(!options("$count=false").unwrap().count);
    }

    #[test]
    fn test_lists_drop_blanks() {
        let o = options("$select=id,%20name,,&$expand=Customer,Items($select=id), ,bad-name").unwrap();
        assert_eq!(o.select, vec!["id", "name"]);
        assert_eq!(o.expand, vec!["Customer", "Items"]);
        assert!(matches!(options("$select=id;drop"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_order_by_drops_invalid_parts_individually() {
        let terms = parse_order_by("name desc, 1bad, total sideways, orders.id, city ASC, id desc nulls");
        assert_eq!(
            terms,
            vec![
                OrderTerm { column: "name".into(), direction: SortDirection::Desc },
                OrderTerm { column: "total".into(), direction: SortDirection::Asc },
                OrderTerm { column: "orders.id".into(), direction: SortDirection::Asc },
                OrderTerm { column: "city".into(), direction: SortDirection::Asc },
                OrderTerm { column: "id".into(), direction: SortDirection::Desc },
            ]
        );
        assert!(parse_order_by("; DROP TABLE x").is_empty());
    }
}
