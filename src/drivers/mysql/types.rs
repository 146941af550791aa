//! MySQL type conversion utilities.
//!
//! This module handles conversion between MySQL-specific types (from SQLx)
//! and the generic `Value` type, in both directions.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::{Error, Result};
use crate::traits::{Cell, ColumnInfo, Row as TraitRow, Value};

pub(crate) type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// Converter between MySQL values and the unified `Value` type.
pub struct MySqlValueConverter;

impl MySqlValueConverter {
    /// Convert a MySQL row to a trait Row.
    pub fn convert_row(mysql_row: &MySqlRow) -> TraitRow {
        let cells = mysql_row
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let value = Self::extract_value(mysql_row, col.type_info().name(), idx);
                Cell::new(value, idx)
            })
            .collect();

        TraitRow::new(cells)
    }

    /// Build column info from a MySQL row.
    pub fn build_column_info(mysql_row: &MySqlRow) -> Vec<ColumnInfo> {
        mysql_row
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

    /// Extract a value from a MySQL row at the given column index.
    fn extract_value(row: &MySqlRow, type_name: &str, index: usize) -> Value {
        match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => return Value::Null,
            Err(_) => return Value::Null,
            _ => {}
        }

        Self::decode_by_type(row, index, type_name)
    }

    /// Decode a value based on its MySQL type name.
    ///
    /// A value whose type is recognized but fails to decode falls through to
    /// the string fallback rather than being reported as NULL.
    fn decode_by_type(row: &MySqlRow, index: usize, type_name: &str) -> Value {
        let decoded = match type_name {
            // TINYINT(1) is reported as BOOLEAN but may hold any TINYINT value
            "BOOLEAN" | "BOOL" => row.try_get_unchecked::<i8, _>(index).map(Value::Int8),
            "TINYINT" => row.try_get::<i8, _>(index).map(Value::Int8),
            "TINYINT UNSIGNED" => row.try_get::<u8, _>(index).map(Value::UInt8),
            "SMALLINT" => row.try_get::<i16, _>(index).map(Value::Int16),
            "SMALLINT UNSIGNED" => row.try_get::<u16, _>(index).map(Value::UInt16),
            "MEDIUMINT" | "INT" | "INTEGER" => row.try_get::<i32, _>(index).map(Value::Int32),
            "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "INTEGER UNSIGNED" => {
                row.try_get::<u32, _>(index).map(Value::UInt32)
            }
            "BIGINT" => row.try_get::<i64, _>(index).map(Value::Int64),
            "BIGINT UNSIGNED" => row.try_get::<u64, _>(index).map(Value::UInt64),

            "FLOAT" => row.try_get::<f32, _>(index).map(Value::Float32),
            "DOUBLE" | "DOUBLE PRECISION" | "REAL" => row.try_get::<f64, _>(index).map(Value::Float64),

            "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => row.try_get::<Decimal, _>(index).map(Value::Decimal),

            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => {
                row.try_get::<String, _>(index).map(Value::Text)
            }

            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                row.try_get::<Vec<u8>, _>(index).map(Value::Bytes)
            }

            // BIT(n) arrives as its raw big-endian bytes
            "BIT" => row.try_get_unchecked::<Vec<u8>, _>(index).map(Value::Bytes),

            "DATE" => row.try_get::<NaiveDate, _>(index).map(Value::Date),
            "TIME" => row.try_get::<NaiveTime, _>(index).map(Value::Time),
            "DATETIME" => row.try_get::<NaiveDateTime, _>(index).map(Value::DateTime),
            "TIMESTAMP" => row
                .try_get::<DateTime<Utc>, _>(index)
                .map(Value::DateTimeTz)
                .or_else(|_| row.try_get::<NaiveDateTime, _>(index).map(Value::DateTime)),

            "YEAR" => row.try_get_unchecked::<u16, _>(index).map(Value::UInt16),

            "JSON" => row.try_get::<serde_json::Value, _>(index).map(Value::Json),

            // ENUM and SET values are text
            _ if type_name.starts_with("ENUM") || type_name.starts_with("SET") => {
                row.try_get_unchecked::<String, _>(index).map(Value::Text)
            }

            _ => return Self::decode_as_string_fallback(row, index, type_name),
        };

        decoded.unwrap_or_else(|_| Self::decode_as_string_fallback(row, index, type_name))
    }

    /// Fallback for unknown types: keep the textual form when there is one.
    fn decode_as_string_fallback(row: &MySqlRow, index: usize, type_name: &str) -> Value {
        if let Ok(s) = row.try_get_unchecked::<String, _>(index) {
            return Value::Other {
                type_name: type_name.to_string(),
                display: s,
            };
        }

        if let Ok(bytes) = row.try_get_unchecked::<Vec<u8>, _>(index) {
            return Value::Bytes(bytes);
        }

        Value::Unsupported {
            type_name: type_name.to_string(),
        }
    }
}

/// Bind one argument to a MySQL query.
pub(crate) fn bind_value<'q>(query: MySqlQuery<'q>, value: &Value) -> Result<MySqlQuery<'q>> {
    let query = match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int8(v) => query.bind(*v),
        Value::Int16(v) => query.bind(*v),
        Value::Int32(v) => query.bind(*v),
        Value::Int64(v) => query.bind(*v),
        Value::UInt8(v) => query.bind(*v),
        Value::UInt16(v) => query.bind(*v),
        Value::UInt32(v) => query.bind(*v),
        Value::UInt64(v) => query.bind(*v),
        Value::Float32(v) => query.bind(*v),
        Value::Float64(v) => query.bind(*v),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Date(d) => query.bind(*d),
        Value::Time(t) => query.bind(*t),
        Value::DateTime(dt) => query.bind(*dt),
        Value::DateTimeTz(dt) => query.bind(*dt),
        Value::Decimal(d) => query.bind(*d),
        Value::Uuid(u) => query.bind(u.to_string()),
        Value::Json(j) => query.bind(j.to_string()),
        Value::Other { display, .. } => query.bind(display.clone()),
        Value::Array(_) | Value::Unsupported { .. } => {
            return Err(Error::query(anyhow!(
                "MySQL cannot bind a {} argument",
                value.type_name()
            )));
        }
    };

    Ok(query)
}

/// Bind every argument in placeholder order.
pub(crate) fn bind_all<'q>(mut query: MySqlQuery<'q>, args: &[Value]) -> Result<MySqlQuery<'q>> {
    for arg in args {
        query = bind_value(query, arg)?;
    }
    Ok(query)
}
