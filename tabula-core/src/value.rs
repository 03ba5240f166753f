//! Tagged cell values returned by the backing engine
//!
//! Rows travel through the pipeline as ordered `Vec<CellValue>` paired with
//! column names, so JSON encoding is an explicit match rather than guesswork
//! on the runtime shape of a value.

use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

/// One value of one column in one row
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Binary(Vec<u8>),
    /// Struct-typed column, fields in declaration order
    Struct(Vec<(String, CellValue)>),
    /// Array-typed column
    List(Vec<CellValue>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Encode for an OData JSON payload
    ///
    /// Dates become `YYYY-MM-DD`, times `HH:MM:SS`, timestamps
    /// `YYYY-MM-DDTHH:MM:SS`. Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            CellValue::String(s) => Value::String(s.clone()),
            CellValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            CellValue::Time(t) => Value::String(t.format("%H:%M:%S").to_string()),
            CellValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            CellValue::Binary(bytes) => {
                Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            CellValue::Struct(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                Value::Object(map)
            }
            CellValue::List(items) => Value::Array(items.iter().map(CellValue::to_json).collect()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_temporal_values_are_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let time = NaiveTime::from_hms_opt(9, 5, 3).unwrap();

        assert_eq!(CellValue::Date(date).to_json(), json!("2024-03-07"));
        assert_eq!(CellValue::Time(time).to_json(), json!("09:05:03"));
        assert_eq!(
            CellValue::DateTime(date.and_time(time)).to_json(),
            json!("2024-03-07T09:05:03")
        );
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(CellValue::Null.to_json(), Value::Null);
        assert_eq!(CellValue::Int(42).to_json(), json!(42));
        assert_eq!(CellValue::Float(1.5).to_json(), json!(1.5));
        assert_eq!(CellValue::Bool(false).to_json(), json!(false));
        assert_eq!(CellValue::from("x").to_json(), json!("x"));
        assert_eq!(CellValue::Float(f64::NAN).to_json(), Value::Null);
    }

    #[test]
    fn test_nested_values() {
        let value = CellValue::Struct(vec![
            ("street".to_string(), CellValue::from("Main St")),
            ("zip".to_string(), CellValue::Int(1000)),
        ]);
        assert_eq!(value.to_json(), json!({"street": "Main St", "zip": 1000}));

        let list = CellValue::List(vec![CellValue::Int(1), CellValue::Null]);
        assert_eq!(list.to_json(), json!([1, null]));
    }

    #[test]
    fn test_binary_is_base64() {
        assert_eq!(CellValue::Binary(b"hi".to_vec()).to_json(), json!("aGk="));
    }
}
