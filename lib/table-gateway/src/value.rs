//! Scalar column values, raw rows, and typed conversion out of them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};

use crate::GatewayError;

/// A value that can be bound to a query parameter or read from a result column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Datetime(DateTime<Utc>),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Datetime(_) => "datetime",
            Value::Date(_) => "date",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Datetime(dt) => {
                serializer.serialize_str(&dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
            }
            Value::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::Datetime(dt)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Typed extraction of a column value.
///
/// `column` is only used to describe failures.
pub trait FromValue: Sized {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError>;
}

fn mismatch<T>(column: &str, expected: &'static str, value: &Value) -> Result<T, GatewayError> {
    Err(GatewayError::ColumnType {
        column: column.to_string(),
        expected,
        found: value.kind(),
    })
}

impl FromValue for Value {
    fn from_value(_column: &str, value: Value) -> Result<Self, GatewayError> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::String(s) => Ok(s),
            other => mismatch(column, "string", &other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::Int(n) => Ok(n),
            other => mismatch(column, "int", &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::Int(n) => {
                i32::try_from(n).or_else(|_| mismatch(column, "int32", &Value::Int(n)))
            }
            other => mismatch(column, "int32", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::Float(n) => Ok(n),
            Value::Int(n) => Ok(n as f64),
            other => mismatch(column, "float", &other),
        }
    }
}

impl FromValue for bool {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::Bool(b) => Ok(b),
            // MySQL reports TINYINT(1) columns as integers
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => mismatch(column, "bool", &other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::Datetime(dt) => Ok(dt),
            Value::String(ref s) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Ok(dt.with_timezone(&Utc));
                }
                match NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                    Ok(naive) => Ok(naive.and_utc()),
                    Err(_) => mismatch(column, "datetime", &value),
                }
            }
            other => mismatch(column, "datetime", &other),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::Date(d) => Ok(d),
            Value::Datetime(dt) => Ok(dt.date_naive()),
            Value::String(ref s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(d) => Ok(d),
                Err(_) => mismatch(column, "date", &value),
            },
            other => mismatch(column, "date", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(column, other).map(Some),
        }
    }
}

/// One result row: column names mapped to values, in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing an existing value of the same name in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.columns.iter().position(|(name, _)| name == column)?;
        Some(self.columns.remove(idx).1)
    }

    /// Keep only the columns for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.columns.retain(|(name, value)| keep(name, value));
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn row_insert_replaces_in_place() {
        let mut row = Row::new().with("a", 1i64).with("b", "x");
        row.insert("a", 2i64);

        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn retain_keeps_order() {
        let mut row = Row::new()
            .with("a", 1i64)
            .with("b", Value::Null)
            .with("c", "x");
        row.retain(|_, value| !value.is_null());

        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn option_maps_null() {
        let none: Option<String> = FromValue::from_value("c", Value::Null).unwrap();
        assert_eq!(none, None);
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("v")), Value::String("v".into()));
    }

    #[test]
    fn type_mismatch_names_the_column() {
        let err = i64::from_value("asset_count", Value::String("2".into())).unwrap_err();
        assert_matches!(
            err,
            GatewayError::ColumnType { column, expected: "int", found: "string" }
                if column == "asset_count"
        );
    }

    #[test]
    fn null_into_required_field_fails() {
        assert_matches!(
            String::from_value("name", Value::Null),
            Err(GatewayError::ColumnType { found: "null", .. })
        );
    }

    #[test]
    fn datetime_parses_text_columns() {
        let dt = DateTime::<Utc>::from_value("created_dt", Value::from("2024-03-01 10:00:00"))
            .unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn row_serializes_as_map() {
        let row = Row::new().with("tag_id", "t1").with("asset_count", 2i64);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"tag_id":"t1","asset_count":2}"#);
    }
}
