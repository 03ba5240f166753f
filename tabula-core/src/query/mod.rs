//! Query translation
//!
//! A request's SQL is built from the collection's base query by a fixed
//! sequence of stages: `$expand`, `$select`, `$filter`, `$orderby`, then
//! pagination. Each stage either wraps the previous query as an aliased
//! subquery or, for `WHERE`/`ORDER BY`, extends the outermost stage the
//! builder itself produced. Caller-provided base SQL is never edited.

pub mod expand;
pub mod options;
pub mod params;

pub use expand::{resolve_expansions, Expansion};
pub use options::{parse_order_by, PageRequest, QueryOptions};
pub use params::QueryParams;

use crate::config::ParsePolicy;
use crate::filter::{self, Condition, FilterOutcome};
use crate::model::Collection;
use crate::sql::{JoinKind, OrderTerm, SelectStage, Source, Sql};
use crate::{Error, Result};

/// Stage-by-stage SQL builder
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    plan: Sql,
}

impl QueryBuilder {
    pub fn new(base_sql: impl Into<String>) -> Self {
        Self { plan: Sql::raw(base_sql) }
    }

    pub fn for_collection(collection: &Collection) -> Self {
        Self::new(collection.base_sql())
    }

    /// Stage that may take a `WHERE` or `ORDER BY`, wrapping when the current one cannot
    fn clause_stage(plan: Sql, alias: &str) -> SelectStage {
        match plan {
            Sql::Select(stage) if stage.accepts_clauses() => *stage,
            other => other.wrap(alias),
        }
    }

    /// LEFT JOIN every expansion onto the current query
    pub fn expand(self, expansions: &[Expansion]) -> Self {
        if expansions.is_empty() {
            return self;
        }

        let mut columns = vec![format!("{}.*", expand::BASE_ALIAS)];
        for expansion in expansions {
            columns.extend(expansion.select_items());
        }

        let mut stage = self.plan.wrap(expand::BASE_ALIAS).columns(columns);
        for expansion in expansions {
            stage = stage.join(
                JoinKind::Left,
                Source::aliased_table(&expansion.reference.target_table, &expansion.alias),
                expansion.join_condition(),
            );
        }
        Self { plan: stage.into() }
    }

    /// Project `columns`; expanded columns are carried along so nesting survives `$select`
    pub fn select(self, columns: &[String], expansions: &[Expansion]) -> Self {
        if columns.is_empty() {
            return self;
        }
        let projected = columns
            .iter()
            .cloned()
            .chain(expansions.iter().flat_map(|e| e.projected_names().map(String::from)));
        Self { plan: self.plan.wrap("selected_data").columns(projected).into() }
    }

    pub fn filter_condition(self, condition: &Condition) -> Self {
        let stage = Self::clause_stage(self.plan, "filtered_data").filter(condition.to_sql());
        Self { plan: stage.into() }
    }

    /// Apply a `$filter` expression; unparsable ones follow `policy`
    pub fn filter(self, expression: Option<&str>, policy: ParsePolicy) -> Result<Self> {
        let Some(expression) = expression else {
            return Ok(self);
        };
        match filter::parse(expression) {
            FilterOutcome::Parsed { condition, .. } => Ok(self.filter_condition(&condition)),
            FilterOutcome::Unparsed { expression, reason } if policy.is_lenient() => {
                log::warn!("ignoring unparsable $filter {:?}: {}", expression, reason);
                Ok(self)
            }
            FilterOutcome::Unparsed { expression, reason } => Err(Error::bad_request(format!(
                "unsupported $filter expression {:?}: {}",
                expression, reason
            ))),
        }
    }

    pub fn order_by(self, terms: &[OrderTerm]) -> Self {
        if terms.is_empty() {
            return self;
        }
        let stage = Self::clause_stage(self.plan, "ordered_data").order_by(terms.to_vec());
        Self { plan: stage.into() }
    }

    /// Over-fetch window: `top + 1` rows from `skip`
    pub fn paginate(self, page: &PageRequest) -> Self {
        let stage = self.plan.wrap("paginated_data").limit(page.fetch_limit(), page.skip);
        Self { plan: stage.into() }
    }

    /// `SELECT COUNT(*)` over the current query
    pub fn count(self) -> Self {
        Self { plan: self.plan.wrap("count_data").columns(["COUNT(*)"]).into() }
    }

    pub fn into_sql(self) -> Sql {
        self.plan
    }

    pub fn render(&self) -> String {
        self.plan.render()
    }
}

/// Page query for a collection request
pub fn build_query(
    collection: &Collection,
    options: &QueryOptions,
    expansions: &[Expansion],
    filter_policy: ParsePolicy,
) -> Result<String> {
    let sql = QueryBuilder::for_collection(collection)
        .expand(expansions)
        .select(&options.select, expansions)
        .filter(options.filter.as_deref(), filter_policy)?
        .order_by(&options.order_by)
        .paginate(&options.page)
        .render();
    log::debug!("{}/{} query: {}", collection.group, collection.name, sql);
    Ok(sql)
}

/// Total-count query: base query and `$filter` only
pub fn build_count_query(
    collection: &Collection,
    filter: Option<&str>,
    filter_policy: ParsePolicy,
) -> Result<String> {
    let sql = QueryBuilder::for_collection(collection).filter(filter, filter_policy)?.count().render();
    log::debug!("{}/{} count: {}", collection.group, collection.name, sql);
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::Reference;
    use crate::sql::SortDirection;

    fn customers() -> Collection {
        Collection::table("sales", "customers", "customers")
    }

    fn page(skip: u64, top: u64) -> PageRequest {
        PageRequest { skip, top, explicit: true }
    }

    #[test]
    fn test_pagination_wraps_with_over_fetch() {
        let sql = QueryBuilder::for_collection(&customers()).paginate(&page(5, 5)).render();
        assert_eq!(sql, "SELECT * FROM (SELECT * FROM customers) AS paginated_data LIMIT 6 OFFSET 5");
    }

    #[test]
    fn test_filter_and_order_share_one_stage() {
        let sql = QueryBuilder::new("SELECT * FROM customers WHERE active = 1;")
            .filter(Some("name eq 'O''Brien'"), ParsePolicy::Reject)
            .unwrap()
            .order_by(&[OrderTerm { column: "name".into(), direction: SortDirection::Desc }])
            .render();
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT * FROM customers WHERE active = 1) AS filtered_data \
             WHERE name = 'O''Brien' ORDER BY name DESC"
        );
    }

    #[test]
    fn test_filter_after_select_extends_the_select_stage() {
        let sql = QueryBuilder::for_collection(&customers())
            .select(&["id".to_string(), "name".to_string()], &[])
            .filter(Some("id gt 3"), ParsePolicy::Reject)
            .unwrap()
            .render();
        assert_eq!(sql, "SELECT id, name FROM (SELECT * FROM customers) AS selected_data WHERE id > 3");
    }

    #[test]
    fn test_unparsable_filter_follows_policy() {
        let err = QueryBuilder::for_collection(&customers())
            .filter(Some("contains(name,'a')"), ParsePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        let sql = QueryBuilder::for_collection(&customers())
            .filter(Some("contains(name,'a')"), ParsePolicy::Ignore)
            .unwrap()
            .render();
        assert_eq!(sql, "SELECT * FROM customers");
    }

    #[test]
    fn test_expand_joins_and_later_clauses_wrap() {
        let orders = Collection::table("sales", "orders", "orders");
        let expansion = Expansion {
            navigation: "Customer".into(),
            alias: "customer".into(),
            reference: Reference::belongs_to("orders", "customer_id", "customers", "id"),
            columns: vec![("customer_name".into(), "name".into())],
        };
        let sql = QueryBuilder::for_collection(&orders)
            .expand(std::slice::from_ref(&expansion))
            .filter(Some("total gt 10"), ParsePolicy::Reject)
            .unwrap()
            .render();
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT base_data.*, customer.name AS customer_name \
             FROM (SELECT * FROM orders) AS base_data \
             LEFT JOIN customers AS customer ON customer.id = base_data.customer_id) AS filtered_data \
             WHERE total > 10"
        );
    }

    #[test]
    fn test_count_ignores_everything_but_filter() {
        let sql = build_count_query(&customers(), Some("id le 3"), ParsePolicy::Reject).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM (SELECT * FROM (SELECT * FROM customers) AS filtered_data WHERE id <= 3) AS count_data"
        );
    }

    #[test]
    fn test_full_pipeline_order() {
        let options = QueryOptions::from_params(
            &QueryParams::parse("$select=id,name&$filter=id gt 1&$orderby=name&$top=2&$skip=4"),
            &Default::default(),
        )
        .unwrap();
        let sql = build_query(&customers(), &options, &[], ParsePolicy::Reject).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT id, name FROM (SELECT * FROM customers) AS selected_data \
             WHERE id > 1 ORDER BY name ASC) AS paginated_data LIMIT 3 OFFSET 4"
        );
    }
}
