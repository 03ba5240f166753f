//! `$filter` expression parsing
//!
//! Parsing is an explicit chain: the strict grammar
//! `value WS comparator WS value` runs first, a permissive single-comparison
//! match runs when it fails, and [`FilterOutcome::Unparsed`] is returned when
//! both fail. What to do with an unparsed filter is the caller's policy
//! ([`crate::config::ParsePolicy`]).
//!
//! Field tokens must be identifiers in both parsers, so nothing from the
//! request reaches the SQL text unvalidated: fields are checked against the
//! identifier pattern and literals are re-escaped.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::sql::{is_qualified_column, quote_literal};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("valid number regex"));

static PERMISSIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*(.+?)\s+(eq|ne|gt|ge|lt|le)\s+(.+?)\s*$").expect("valid filter regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    /// OData keyword, lowercase only
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "eq" => Some(Comparator::Eq),
            "ne" => Some(Comparator::Ne),
            "gt" => Some(Comparator::Gt),
            "ge" => Some(Comparator::Ge),
            "lt" => Some(Comparator::Lt),
            "le" => Some(Comparator::Le),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Unescaped content, quotes already collapsed
    String(String),
    /// Validated integer or decimal text
    Number(String),
    Bool(bool),
    Null,
}

impl Literal {
    fn to_sql(&self) -> String {
        match self {
            Literal::String(s) => quote_literal(s),
            Literal::Number(n) => n.clone(),
            Literal::Bool(true) => "TRUE".to_string(),
            Literal::Bool(false) => "FALSE".to_string(),
            Literal::Null => "NULL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(String),
    Literal(Literal),
}

impl Operand {
    fn to_sql(&self) -> String {
        match self {
            Operand::Field(name) => name.clone(),
            Operand::Literal(literal) => literal.to_sql(),
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Operand::Literal(Literal::Null))
    }
}

/// A single parsed comparison, ready to be placed in a `WHERE` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Operand,
    pub comparator: Comparator,
    pub right: Operand,
}

impl Condition {
    pub fn to_sql(&self) -> String {
        match (self.comparator, self.left.is_null(), self.right.is_null()) {
            (Comparator::Eq, false, true) => format!("{} IS NULL", self.left.to_sql()),
            (Comparator::Ne, false, true) => format!("{} IS NOT NULL", self.left.to_sql()),
            (Comparator::Eq, true, false) => format!("{} IS NULL", self.right.to_sql()),
            (Comparator::Ne, true, false) => format!("{} IS NOT NULL", self.right.to_sql()),
            _ => format!(
                "{} {} {}",
                self.left.to_sql(),
                self.comparator.as_sql(),
                self.right.to_sql()
            ),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Which parser accepted the expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Strict,
    Permissive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Parsed { condition: Condition, mode: ParseMode },
    Unparsed { expression: String, reason: String },
}

/// Parse a `$filter` expression
pub fn parse(expression: &str) -> FilterOutcome {
    let strict_error = match parse_strict(expression) {
        Ok(condition) => return FilterOutcome::Parsed { condition, mode: ParseMode::Strict },
        Err(e) => e,
    };

    match parse_permissive(expression) {
        Some(condition) => {
            log::debug!("filter {:?} accepted by permissive parser ({})", expression, strict_error);
            FilterOutcome::Parsed { condition, mode: ParseMode::Permissive }
        }
        None => FilterOutcome::Unparsed {
            expression: expression.to_string(),
            reason: strict_error,
        },
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Quoted(String),
    Word(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '\'' {
            chars.next();
            let mut content = String::new();
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        content.push('\'');
                    }
                    Some('\'') => break,
                    Some(ch) => content.push(ch),
                    None => return Err("unterminated string literal".to_string()),
                }
            }
            if let Some(&next) = chars.peek() {
                if !next.is_whitespace() {
                    return Err(format!("unexpected {:?} after string literal", next));
                }
            }
            tokens.push(Token::Quoted(content));
            continue;
        }

        let mut word = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_whitespace() {
                break;
            }
            if ch == '\'' {
                return Err("quote inside bare token".to_string());
            }
            word.push(ch);
            chars.next();
        }
        tokens.push(Token::Word(word));
    }

    Ok(tokens)
}

fn classify_word(word: &str) -> Option<Operand> {
    match word {
        "true" => return Some(Operand::Literal(Literal::Bool(true))),
        "false" => return Some(Operand::Literal(Literal::Bool(false))),
        "null" => return Some(Operand::Literal(Literal::Null)),
        _ => {}
    }
    if NUMBER.is_match(word) {
        return Some(Operand::Literal(Literal::Number(word.to_string())));
    }
    if is_qualified_column(word) {
        return Some(Operand::Field(word.to_string()));
    }
    None
}

fn strict_value(token: Token) -> Result<Operand, String> {
    match token {
        Token::Quoted(content) => Ok(Operand::Literal(Literal::String(content))),
        Token::Word(word) => classify_word(&word).ok_or_else(|| format!("invalid value {:?}", word)),
    }
}

fn build_condition(left: Operand, comparator: Comparator, right: Operand) -> Result<Condition, String> {
    let null_operand = left.is_null() || right.is_null();
    if null_operand && !matches!(comparator, Comparator::Eq | Comparator::Ne) {
        return Err("null only supports eq and ne".to_string());
    }
    Ok(Condition { left, comparator, right })
}

fn parse_strict(expression: &str) -> Result<Condition, String> {
    let mut tokens = tokenize(expression)?.into_iter();
    let (Some(left), Some(op), Some(right), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err("expected `value comparator value`".to_string());
    };

    let comparator = match op {
        Token::Word(word) => {
            Comparator::from_keyword(&word).ok_or_else(|| format!("unknown comparator {:?}", word))?
        }
        Token::Quoted(_) => return Err("comparator cannot be quoted".to_string()),
    };

    build_condition(strict_value(left)?, comparator, strict_value(right)?)
}

fn strip_parens(expression: &str) -> &str {
    let trimmed = expression.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// A quoted literal whose inner quotes are all doubled
fn single_quoted(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('\'')?.strip_suffix('\'')?;
    if inner.replace("''", "").contains('\'') {
        return None;
    }
    Some(inner.replace("''", "'"))
}

fn is_bare_word(raw: &str) -> bool {
    !raw.is_empty() && !raw.contains('\'') && !raw.contains(char::is_whitespace)
}

fn permissive_value(raw: &str) -> Option<Operand> {
    let raw = raw.trim();
    if raw.starts_with('\'') {
        return single_quoted(raw).map(|s| Operand::Literal(Literal::String(s)));
    }
    if !is_bare_word(raw) {
        return None;
    }
    if let Some(operand) = classify_word(&raw.to_ascii_lowercase())
        .filter(|op| matches!(op, Operand::Literal(_)))
    {
        return Some(operand);
    }
    classify_word(raw)
}

fn parse_permissive(expression: &str) -> Option<Condition> {
    let captures = PERMISSIVE.captures(strip_parens(expression))?;
    let comparator = Comparator::from_keyword(&captures[2].to_ascii_lowercase())?;

    let left = permissive_value(&captures[1])?;
    let raw_right = captures[3].trim();
    let right = match permissive_value(raw_right) {
        Some(operand) => operand,
        // A lone unquoted word on the value side is read as a string
        None if matches!(left, Operand::Field(_)) && is_bare_word(raw_right) => {
            Operand::Literal(Literal::String(raw_right.to_string()))
        }
        None => return None,
    };

    build_condition(left, comparator, right).ok()
}
