//! Parameter binding and row decoding for MySQL.

use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Arguments, Column, MySql, Row as _, TypeInfo};
use table_gateway::{GatewayError, Row, Value};

/// Bind statement parameters in order.
pub fn bind_params(params: &[Value]) -> Result<MySqlArguments, GatewayError> {
    let mut args = MySqlArguments::default();
    for value in params {
        match value {
            Value::String(s) => args.add(s.clone()),
            Value::Int(n) => args.add(*n),
            Value::Float(n) => args.add(*n),
            Value::Bool(b) => args.add(*b),
            Value::Datetime(dt) => args.add(*dt),
            Value::Date(d) => args.add(*d),
            Value::Null => args.add(None::<String>),
        }
        .map_err(GatewayError::Database)?;
    }
    Ok(args)
}

fn get<'r, T>(row: &'r MySqlRow, index: usize) -> Result<Option<T>, GatewayError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<Option<T>, _>(index)
        .map_err(GatewayError::database)
}

fn unsigned(name: &str, n: u64) -> Result<Value, GatewayError> {
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| GatewayError::ColumnType {
            column: name.to_string(),
            expected: "BIGINT",
            found: "BIGINT UNSIGNED out of range",
        })
}

fn decode_column(
    row: &MySqlRow,
    index: usize,
    name: &str,
    type_name: &str,
) -> Result<Value, GatewayError> {
    let value = match type_name {
        "BOOLEAN" => get::<bool>(row, index)?.map(Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            get::<i64>(row, index)?.map(Value::Int)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => match get::<u64>(row, index)? {
            Some(n) => Some(unsigned(name, n)?),
            None => None,
        },
        "FLOAT" | "DOUBLE" => get::<f64>(row, index)?.map(Value::Float),
        "DATETIME" | "TIMESTAMP" => {
            get::<chrono::DateTime<chrono::Utc>>(row, index)?.map(Value::Datetime)
        }
        "DATE" => get::<chrono::NaiveDate>(row, index)?.map(Value::Date),
        "JSON" => get::<serde_json::Value>(row, index)?.map(|json| Value::String(json.to_string())),
        "DECIMAL" => {
            return Err(GatewayError::ColumnType {
                column: name.to_string(),
                expected: "BIGINT or DOUBLE",
                found: "DECIMAL",
            });
        }
        // VARCHAR, CHAR, TEXT, ENUM, ...
        _ => get::<String>(row, index)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Decode a result row into column name / value pairs.
pub fn decode_row(row: &MySqlRow) -> Result<Row, GatewayError> {
    let mut decoded = Row::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = decode_column(
            row,
            column.ordinal(),
            column.name(),
            column.type_info().name(),
        )?;
        decoded.insert(column.name(), value);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unsigned_ids_fit_or_fail() {
        assert_eq!(unsigned("id", 42).unwrap(), Value::Int(42));
        assert_matches!(unsigned("id", u64::MAX), Err(GatewayError::ColumnType { .. }));
    }
}
