//! Engine type names to EDM types

/// EDM primitive for a declared column type; unknown types map to `Edm.String`
pub fn edm_type(declared: &str) -> &'static str {
    let upper = declared.trim().to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();

    match base {
        "TINYINT" | "INT1" | "UTINYINT" => "Edm.Byte",
        "SMALLINT" | "INT2" | "SHORT" | "USMALLINT" => "Edm.Int16",
        "INTEGER" | "INT" | "INT4" | "MEDIUMINT" | "SIGNED" | "UINTEGER" => "Edm.Int32",
        "BIGINT" | "INT8" | "LONG" | "HUGEINT" | "UBIGINT" | "UNSIGNED BIG INT" => "Edm.Int64",
        "REAL" | "FLOAT" | "FLOAT4" => "Edm.Single",
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => "Edm.Double",
        "DECIMAL" | "NUMERIC" => "Edm.Decimal",
        "BOOLEAN" | "BOOL" | "LOGICAL" => "Edm.Boolean",
        "DATE" => "Edm.Date",
        "TIME" => "Edm.TimeOfDay",
        "UUID" | "GUID" | "UNIQUEIDENTIFIER" => "Edm.Guid",
        "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" => "Edm.Binary",
        _ if base.starts_with("TIMESTAMP") || base.starts_with("DATETIME") => "Edm.DateTimeOffset",
        _ if base.starts_with("TIME") => "Edm.TimeOfDay",
        _ if base.contains("CHAR") || base.contains("TEXT") || base.contains("CLOB") => "Edm.String",
        _ if base.contains("INT") => "Edm.Int64",
        _ => "Edm.String",
    }
}

/// Shape of a declared column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnShape {
    Scalar(String),
    Struct(Vec<(String, ColumnShape)>),
    List(Box<ColumnShape>),
}

impl ColumnShape {
    /// Parse `STRUCT(a INTEGER, b VARCHAR)`, `T[]` and plain scalar type names
    pub fn parse(declared: &str) -> Self {
        let trimmed = declared.trim();
        if let Some(element) = trimmed.strip_suffix("[]") {
            return ColumnShape::List(Box::new(Self::parse(element)));
        }

        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("STRUCT(") && trimmed.ends_with(')') {
            let inner = &trimmed["STRUCT(".len()..trimmed.len() - 1];
            let fields = split_top_level(inner)
                .into_iter()
                .filter_map(|field| {
                    let field = field.trim();
                    let (name, ty) = split_field(field)?;
                    Some((name, Self::parse(ty)))
                })
                .collect();
            return ColumnShape::Struct(fields);
        }

        ColumnShape::Scalar(trimmed.to_string())
    }
}

/// Split on commas outside parentheses and quotes
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

/// `name TYPE` or `"quoted name" TYPE`
fn split_field(field: &str) -> Option<(String, &str)> {
    if let Some(rest) = field.strip_prefix('"') {
        let end = rest.find('"')?;
        return Some((rest[..end].to_string(), rest[end + 1..].trim()));
    }
    let (name, ty) = field.split_once(char::is_whitespace)?;
    Some((name.to_string(), ty.trim()))
}
