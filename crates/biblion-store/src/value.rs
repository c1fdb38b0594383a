//! Conversions between engine values and DuckDB values

use biblion_core::{ColumnType, Value};
use duckdb::ToSql;
use duckdb::types::{ToSqlOutput, Value as DuckValue, ValueRef};

/// Column type used to store a virtual column.
pub fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text | ColumnType::BlobRef => "VARCHAR",
        ColumnType::Integer => "BIGINT",
        ColumnType::Real => "DOUBLE",
    }
}

/// Double-quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Newtype so engine values can be bound as statement parameters.
pub struct Param<'a>(pub &'a Value);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(DuckValue::Null),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(n) => ToSqlOutput::Owned(DuckValue::BigInt(*n)),
            Value::Real(x) => ToSqlOutput::Owned(DuckValue::Double(*x)),
        })
    }
}

/// Engine value of a query result cell.
pub fn from_duck(v: DuckValue) -> Value {
    match v {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::from(b),
        DuckValue::TinyInt(n) => Value::Integer(i64::from(n)),
        DuckValue::SmallInt(n) => Value::Integer(i64::from(n)),
        DuckValue::Int(n) => Value::Integer(i64::from(n)),
        DuckValue::BigInt(n) => Value::Integer(n),
        DuckValue::UTinyInt(n) => Value::Integer(i64::from(n)),
        DuckValue::USmallInt(n) => Value::Integer(i64::from(n)),
        DuckValue::UInt(n) => Value::Integer(i64::from(n)),
        DuckValue::UBigInt(n) => i64::try_from(n).map_or(Value::Real(n as f64), Value::Integer),
        DuckValue::HugeInt(n) => i64::try_from(n).map_or(Value::Real(n as f64), Value::Integer),
        DuckValue::Float(x) => Value::Real(f64::from(x)),
        DuckValue::Double(x) => Value::Real(x),
        DuckValue::Text(s) => Value::Text(s),
        other => Value::Text(format!("{other:?}")),
    }
}
