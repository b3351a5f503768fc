//! Parameter binding and row decoding for PostgreSQL.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, Column, Row as _, TypeInfo};
use table_gateway::{GatewayError, Row, Value};

/// Bind statement parameters in order.
pub fn bind_params(params: &[Value]) -> Result<PgArguments, GatewayError> {
    let mut args = PgArguments::default();
    for value in params {
        bind_value(&mut args, value)?;
    }
    Ok(args)
}

fn bind_value(args: &mut PgArguments, value: &Value) -> Result<(), GatewayError> {
    match value {
        Value::String(s) => args.add(s.clone()),
        Value::Int(n) => args.add(*n),
        Value::Float(n) => args.add(*n),
        Value::Bool(b) => args.add(*b),
        Value::Datetime(dt) => args.add(*dt),
        Value::Date(d) => args.add(*d),
        Value::Null => args.add(None::<String>),
    }
    .map_err(GatewayError::Database)
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>, GatewayError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .map_err(GatewayError::database)
}

fn or_null<T>(value: Option<T>, map: impl FnOnce(T) -> Value) -> Value {
    value.map(map).unwrap_or(Value::Null)
}

/// Decode one column by its PostgreSQL type name.
fn decode_column(
    row: &PgRow,
    index: usize,
    name: &str,
    type_name: &str,
) -> Result<Value, GatewayError> {
    let value = match type_name {
        "BOOL" => or_null(get::<bool>(row, index)?, Value::Bool),
        "INT2" => or_null(get::<i16>(row, index)?, |n| Value::Int(i64::from(n))),
        "INT4" => or_null(get::<i32>(row, index)?, |n| Value::Int(i64::from(n))),
        "INT8" => or_null(get::<i64>(row, index)?, Value::Int),
        "FLOAT4" => or_null(get::<f32>(row, index)?, |n| Value::Float(f64::from(n))),
        "FLOAT8" => or_null(get::<f64>(row, index)?, Value::Float),
        "TIMESTAMPTZ" => or_null(
            get::<chrono::DateTime<chrono::Utc>>(row, index)?,
            Value::Datetime,
        ),
        "TIMESTAMP" => or_null(get::<chrono::NaiveDateTime>(row, index)?, |dt| {
            Value::Datetime(dt.and_utc())
        }),
        "DATE" => or_null(get::<chrono::NaiveDate>(row, index)?, Value::Date),
        "UUID" => or_null(get::<uuid::Uuid>(row, index)?, |id| {
            Value::String(id.to_string())
        }),
        "JSON" | "JSONB" => or_null(get::<serde_json::Value>(row, index)?, |json| {
            Value::String(json.to_string())
        }),
        "NUMERIC" => {
            // Aggregates such as SUM(bigint) are NUMERIC; cast them in SQL.
            return Err(GatewayError::ColumnType {
                column: name.to_string(),
                expected: "INT8 or FLOAT8",
                found: "NUMERIC",
            });
        }
        // TEXT, VARCHAR, BPCHAR, NAME, ...
        _ => or_null(get::<String>(row, index)?, Value::String),
    };
    Ok(value)
}

/// Decode a result row into column name / value pairs.
pub fn decode_row(row: &PgRow) -> Result<Row, GatewayError> {
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

    #[test]
    fn binds_every_parameter() {
        let bound = bind_params(&[
            Value::from("x"),
            Value::from(1i64),
            Value::from(2.5),
            Value::from(true),
            Value::from(table_gateway::time::now()),
            Value::from(table_gateway::time::today()),
        ]);
        assert!(bound.is_ok());
    }
}
