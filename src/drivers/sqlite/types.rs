//! SQLite type conversion utilities.
//!
//! This module handles conversion between SQLite values (from SQLx)
//! and the generic `Value` type, in both directions.
//!
//! SQLite uses dynamic typing with type affinity:
//! - INTEGER: 64-bit signed integer
//! - REAL: 64-bit floating point
//! - TEXT: UTF-8 string
//! - BLOB: Binary data
//! - NULL: Null value
//!
//! Columns computed from expressions carry no declared type; their values are
//! decoded from the storage class of each individual value.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::{Error, Result};
use crate::traits::{Cell, ColumnInfo, Row as TraitRow, Value};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Converter between SQLite values and the unified `Value` type.
pub struct SqliteValueConverter;

impl SqliteValueConverter {
    /// Convert a SQLite row to a trait Row.
    pub fn convert_row(sqlite_row: &SqliteRow) -> TraitRow {
        let cells = (0..sqlite_row.columns().len())
            .map(|idx| Cell::new(Self::extract_value(sqlite_row, idx), idx))
            .collect();

        TraitRow::new(cells)
    }

    /// Build column info from a SQLite row.
    pub fn build_column_info(sqlite_row: &SqliteRow) -> Vec<ColumnInfo> {
        sqlite_row
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                ColumnInfo::new(
                    col.name().to_string(),
                    col.type_info().name().to_string(),
                    idx,
                )
            })
            .collect()
    }

    /// Extract a value from a SQLite row at the given column index.
    fn extract_value(row: &SqliteRow, index: usize) -> Value {
        let raw = match row.try_get_raw(index) {
            Ok(raw) => raw,
            Err(_) => return Value::Null,
        };
        if raw.is_null() {
            return Value::Null;
        }

        let declared = row.columns()[index].type_info();
        let type_name = if declared.is_null() {
            raw.type_info().name().to_uppercase()
        } else {
            declared.name().to_uppercase()
        };

        Self::decode_by_type(row, index, &type_name)
    }

    /// Decode a value based on its SQLite type name.
    ///
    /// SQLite has type affinity rules:
    /// - INTEGER affinity: INT, INTEGER, TINYINT, SMALLINT, MEDIUMINT, BIGINT, etc.
    /// - REAL affinity: REAL, DOUBLE, FLOAT
    /// - TEXT affinity: TEXT, VARCHAR, CHAR, CLOB
    /// - BLOB affinity: BLOB
    /// - NUMERIC affinity: NUMERIC, DECIMAL, BOOLEAN, DATE, DATETIME
    ///
    /// A stored value that does not match its column's affinity falls back to
    /// its own storage class.
    fn decode_by_type(row: &SqliteRow, index: usize, type_name: &str) -> Value {
        match type_name {
            "INTEGER" | "INT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "BIGINT"
            | "UNSIGNED BIG INT" | "INT2" | "INT8" => row
                .try_get::<i64, _>(index)
                .map(Value::Int64)
                .unwrap_or_else(|_| Self::decode_unknown(row, index, type_name)),

            // Stored as plain integers; the stored value passes through
            "BOOLEAN" | "BOOL" => Self::decode_unknown(row, index, type_name),

            "REAL" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" => row
                .try_get::<f64, _>(index)
                .map(Value::Float64)
                .unwrap_or_else(|_| Self::decode_unknown(row, index, type_name)),

            "TEXT" | "VARCHAR" | "VARYING CHARACTER" | "NCHAR" | "NATIVE CHARACTER"
            | "NVARCHAR" | "CLOB" | "CHARACTER" | "CHAR" => row
                .try_get::<String, _>(index)
                .map(Value::Text)
                .unwrap_or_else(|_| Self::decode_unknown(row, index, type_name)),

            "BLOB" => row
                .try_get::<Vec<u8>, _>(index)
                .map(Value::Bytes)
                .unwrap_or_else(|_| Self::decode_unknown(row, index, type_name)),

            // Date/Time types (SQLite stores as TEXT, REAL, or INTEGER)
            "DATE" => Self::decode_date(row, index),
            "TIME" => Self::decode_time(row, index),
            "DATETIME" | "TIMESTAMP" => Self::decode_datetime(row, index),

            "NUMERIC" | "DECIMAL" => Self::decode_numeric(row, index),

            _ => Self::decode_unknown(row, index, type_name),
        }
    }

    /// Decode a DATE value (SQLite stores dates as TEXT in ISO format).
    fn decode_date(row: &SqliteRow, index: usize) -> Value {
        if let Ok(s) = row.try_get::<String, _>(index) {
            return NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(Value::Date)
                .unwrap_or(Value::Text(s));
        }

        Self::decode_unknown(row, index, "DATE")
    }

    /// Decode a TIME value.
    fn decode_time(row: &SqliteRow, index: usize) -> Value {
        if let Ok(s) = row.try_get::<String, _>(index) {
            return NaiveTime::parse_from_str(&s, "%H:%M:%S%.f")
                .map(Value::Time)
                .unwrap_or(Value::Text(s));
        }

        Self::decode_unknown(row, index, "TIME")
    }

    /// Decode a DATETIME value.
    fn decode_datetime(row: &SqliteRow, index: usize) -> Value {
        if let Ok(s) = row.try_get::<String, _>(index) {
            return parse_datetime_text(&s).unwrap_or(Value::Text(s));
        }

        // Unix timestamp (seconds since epoch)
        if let Ok(timestamp) = row.try_get::<i64, _>(index) {
            if let Some(dt) = DateTime::from_timestamp(timestamp, 0) {
                return Value::DateTimeTz(dt);
            }
        }

        // Julian day number
        if let Ok(julian) = row.try_get::<f64, _>(index) {
            let unix_days = julian - 2440587.5;
            let secs = (unix_days * 86400.0) as i64;
            if let Some(dt) = DateTime::from_timestamp(secs, 0) {
                return Value::DateTimeTz(dt);
            }
        }

        Self::decode_unknown(row, index, "DATETIME")
    }

    /// Decode a NUMERIC/DECIMAL value.
    fn decode_numeric(row: &SqliteRow, index: usize) -> Value {
        if let Ok(i) = row.try_get::<i64, _>(index) {
            return Value::Int64(i);
        }

        if let Ok(f) = row.try_get::<f64, _>(index) {
            return Value::Float64(f);
        }

        if let Ok(s) = row.try_get::<String, _>(index) {
            return s
                .parse::<rust_decimal::Decimal>()
                .map(Value::Decimal)
                .unwrap_or(Value::Text(s));
        }

        Self::decode_unknown(row, index, "NUMERIC")
    }

    /// Decode by storage class when the declared type gives no guidance.
    fn decode_unknown(row: &SqliteRow, index: usize, type_name: &str) -> Value {
        let decoded = match Self::storage_class(row, index).as_str() {
            "NULL" => return Value::Null,
            "INTEGER" => row.try_get_unchecked::<i64, _>(index).map(Value::Int64),
            "REAL" => row.try_get_unchecked::<f64, _>(index).map(Value::Float64),
            "TEXT" => row.try_get_unchecked::<String, _>(index).map(Value::Text),
            "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(index).map(Value::Bytes),
            _ => return unsupported(type_name),
        };

        decoded.unwrap_or_else(|_| unsupported(type_name))
    }

    /// Storage class of the value actually stored in the cell
    fn storage_class(row: &SqliteRow, index: usize) -> String {
        row.try_get_raw(index)
            .map(|raw| raw.type_info().name().to_uppercase())
            .unwrap_or_default()
    }
}

fn unsupported(type_name: &str) -> Value {
    Value::Unsupported {
        type_name: type_name.to_string(),
    }
}

/// Parse the text forms SQLite date functions and sqlx produce.
fn parse_datetime_text(s: &str) -> Option<Value> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Value::DateTimeTz(dt.with_timezone(&Utc)));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(Value::DateTime)
}

/// Bind one argument to a SQLite query.
///
/// Unsigned 64-bit values beyond `i64::MAX` and decimals travel as text.
pub(crate) fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> Result<SqliteQuery<'q>> {
    let query = match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int8(v) => query.bind(*v as i64),
        Value::Int16(v) => query.bind(*v as i64),
        Value::Int32(v) => query.bind(*v as i64),
        Value::Int64(v) => query.bind(*v),
        Value::UInt8(v) => query.bind(*v as i64),
        Value::UInt16(v) => query.bind(*v as i64),
        Value::UInt32(v) => query.bind(*v as i64),
        Value::UInt64(v) => match i64::try_from(*v) {
            Ok(v) => query.bind(v),
            Err(_) => query.bind(v.to_string()),
        },
        Value::Float32(v) => query.bind(*v as f64),
        Value::Float64(v) => query.bind(*v),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Date(d) => query.bind(*d),
        Value::Time(t) => query.bind(*t),
        Value::DateTime(dt) => query.bind(*dt),
        Value::DateTimeTz(dt) => query.bind(*dt),
        Value::Decimal(d) => query.bind(d.to_string()),
        Value::Uuid(u) => query.bind(u.to_string()),
        Value::Json(j) => query.bind(j.to_string()),
        Value::Other { display, .. } => query.bind(display.clone()),
        Value::Array(_) | Value::Unsupported { .. } => {
            return Err(Error::query(anyhow!(
                "SQLite cannot bind a {} argument",
                value.type_name()
            )));
        }
    };

    Ok(query)
}

/// Bind every argument in placeholder order.
pub(crate) fn bind_all<'q>(mut query: SqliteQuery<'q>, args: &[Value]) -> Result<SqliteQuery<'q>> {
    for arg in args {
        query = bind_value(query, arg)?;
    }
    Ok(query)
}
