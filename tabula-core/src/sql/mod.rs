//! SQL fragment builder
//!
//! Every query stage is expressed as a [`SelectStage`] that wraps the previous
//! stage as an aliased subquery. Identifier validation and literal escaping
//! live here so callers never interpolate raw request text.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

static QUALIFIED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid column regex")
});

static TABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid table regex")
});

static SELECT_STAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*SELECT\s+\*\s+FROM\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*;?\s*$")
        .expect("valid select-star regex")
});

/// Plain identifier: `customer_id`
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Identifier with at most one qualifier: `orders.total`
pub fn is_qualified_column(s: &str) -> bool {
    QUALIFIED_COLUMN.is_match(s)
}

/// Table name with any number of schema qualifiers: `main.sales.orders`
pub fn is_table_reference(s: &str) -> bool {
    TABLE_REFERENCE.is_match(s)
}

/// `SELECT * FROM <table>` with nothing else, returning the table
pub fn select_star_table(sql: &str) -> Option<&str> {
    SELECT_STAR.captures(sql).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Last segment of a possibly schema-qualified table name
pub fn strip_schema(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}

/// Single-quoted SQL string literal with embedded quotes doubled
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Double-quoted identifier, used for engine-generated names such as temp views
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc`/`desc` in any case; anything else is rejected
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Inner => "INNER JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub source: Source,
    pub on: String,
}

/// Row source of a `FROM` or `JOIN`
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table { name: String, alias: Option<String> },
    Subquery { query: Box<Sql>, alias: String },
}

impl Source {
    pub fn table(name: impl Into<String>) -> Self {
        Source::Table { name: name.into(), alias: None }
    }

    pub fn aliased_table(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Source::Table { name: name.into(), alias: Some(alias.into()) }
    }

    pub fn subquery(query: Sql, alias: impl Into<String>) -> Self {
        Source::Subquery { query: Box::new(query), alias: alias.into() }
    }

    /// Name columns of this source are qualified with
    pub fn reference_name(&self) -> &str {
        match self {
            Source::Table { name, alias } => alias.as_deref().unwrap_or(name),
            Source::Subquery { alias, .. } => alias,
        }
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Source::Table { name, alias: Some(alias) } => {
                let _ = write!(out, "{} AS {}", name, alias);
            }
            Source::Table { name, alias: None } => out.push_str(name),
            Source::Subquery { query, alias } => {
                let _ = write!(out, "({}) AS {}", query.render(), alias);
            }
        }
    }
}

/// One `SELECT` level of a query plan
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStage {
    columns: Vec<String>,
    from: Source,
    joins: Vec<Join>,
    conditions: Vec<String>,
    order_by: Vec<OrderTerm>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectStage {
    /// `SELECT * FROM <source>`
    pub fn from(source: Source) -> Self {
        Self {
            columns: Vec::new(),
            from: source,
            joins: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn source(&self) -> &Source {
        &self.from
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn join(mut self, kind: JoinKind, source: Source, on: impl Into<String>) -> Self {
        self.joins.push(Join { kind, source, on: on.into() });
        self
    }

    /// AND a condition into the `WHERE` clause
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Column references in a `WHERE` or `ORDER BY` of a joined stage may be
    /// ambiguous, so such stages are wrapped rather than extended
    pub fn accepts_clauses(&self) -> bool {
        self.joins.is_empty() && self.limit.is_none()
    }

    pub fn order_by(mut self, terms: Vec<OrderTerm>) -> Self {
        self.order_by.extend(terms);
        self
    }

    pub fn limit(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::from("SELECT ");
        if self.columns.is_empty() {
            out.push('*');
        } else {
            out.push_str(&self.columns.join(", "));
        }

        out.push_str(" FROM ");
        self.from.render_into(&mut out);

        for join in &self.joins {
            out.push(' ');
            out.push_str(join.kind.as_sql());
            out.push(' ');
            join.source.render_into(&mut out);
            let _ = write!(out, " ON {}", join.on);
        }

        match self.conditions.as_slice() {
            [] => {}
            [single] => {
                let _ = write!(out, " WHERE {}", single);
            }
            many => {
                let joined =
                    many.iter().map(|c| format!("({})", c)).collect::<Vec<_>>().join(" AND ");
                let _ = write!(out, " WHERE {}", joined);
            }
        }

        if !self.order_by.is_empty() {
            let terms = self
                .order_by
                .iter()
                .map(|t| format!("{} {}", t.column, t.direction.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(out, " ORDER BY {}", terms);
        }

        if let Some(limit) = self.limit {
            let _ = write!(out, " LIMIT {}", limit);
            if let Some(offset) = self.offset {
                let _ = write!(out, " OFFSET {}", offset);
            }
        }

        out
    }
}

/// A query at some point of the plan
#[derive(Debug, Clone, PartialEq)]
pub enum Sql {
    /// Caller-provided SQL text, never inspected or edited
    Raw(String),
    Select(Box<SelectStage>),
}

impl Sql {
    pub fn raw(sql: impl Into<String>) -> Self {
        Sql::Raw(sql.into())
    }

    /// `SELECT * FROM (<self>) AS <alias>`
    pub fn wrap(self, alias: &str) -> SelectStage {
        SelectStage::from(Source::subquery(self, alias))
    }

    pub fn render(&self) -> String {
        match self {
            Sql::Raw(sql) => sql.trim().trim_end_matches(';').trim_end().to_string(),
            Sql::Select(stage) => stage.render(),
        }
    }
}

impl From<SelectStage> for Sql {
    fn from(stage: SelectStage) -> Self {
        Sql::Select(Box::new(stage))
    }
}
