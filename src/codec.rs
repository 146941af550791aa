//! Row codec: turns scanned rows into name-keyed maps.
//!
//! Two shapes are produced:
//!
//! - **Generic values** ([`row_to_value_map`]): every cell is moved through unchanged,
//!   so callers see the backend-native representation.
//! - **Canonical strings** ([`row_to_string_map`]): every cell is rendered with
//!   [`value_to_string`]. One value that cannot be rendered aborts the whole row.
//!
//! When a result set carries the same column name twice (joins), the last
//! occurrence wins in the map. Positional access through [`Row`] keeps every cell.

use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};

use crate::error::{Error, Result};
use crate::traits::{ColumnInfo, ResultSet, Row, Value};

/// Column name to generic value.
pub type ValueMap = HashMap<String, Value>;

/// Column name to canonical string.
pub type StringMap = HashMap<String, String>;

/// Render a single value as its canonical string.
///
/// `column` is only used to label an [`Error::UnsupportedType`].
pub fn value_to_string(column: &str, value: &Value) -> Result<String> {
    let rendered = match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int8(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::UInt8(v) => v.to_string(),
        Value::UInt16(v) => v.to_string(),
        Value::UInt32(v) => v.to_string(),
        Value::UInt64(v) => v.to_string(),
        // Display for floats is the shortest round-trip form and never uses exponents
        Value::Float32(v) if v.is_finite() => v.to_string(),
        Value::Float64(v) if v.is_finite() => v.to_string(),
        Value::Float32(v) => non_finite_to_string(f64::from(*v)),
        Value::Float64(v) => non_finite_to_string(*v),
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => bytes_to_string(b),
        Value::Date(d) => timestamp_to_string(&d.and_time(NaiveTime::MIN).and_utc()),
        Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        Value::DateTime(dt) => timestamp_to_string(&dt.and_utc()),
        Value::DateTimeTz(dt) => timestamp_to_string(dt),
        Value::Decimal(d) => d.to_string(),
        Value::Uuid(u) => u.to_string(),
        Value::Json(j) => j.to_string(),
        Value::Other { display, .. } => display.clone(),
        Value::Array(_) | Value::Unsupported { .. } => {
            return Err(Error::UnsupportedType {
                column: column.to_string(),
                type_name: value.type_name().to_string(),
            });
        }
    };

    Ok(rendered)
}

fn non_finite_to_string(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v > 0.0 {
        "+Inf".to_string()
    } else {
        "-Inf".to_string()
    }
}

/// RFC3339 in UTC with up to nanosecond precision; trailing zero digits of
/// the fraction are dropped, and so is the fraction when it is zero.
fn timestamp_to_string(dt: &DateTime<Utc>) -> String {
    let full = dt.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let Some(body) = full.strip_suffix('Z') else {
        return full;
    };
    let body = if body.contains('.') {
        body.trim_end_matches('0').trim_end_matches('.')
    } else {
        body
    };
    format!("{}Z", body)
}

/// Raw bytes read as text; a lone NUL byte is how some engines encode a zero bit.
fn bytes_to_string(bytes: &[u8]) -> String {
    if matches!(bytes, [0]) {
        return "0".to_string();
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Move a row's values into a name-keyed map without coercion.
pub fn row_to_value_map(columns: &[ColumnInfo], row: Row) -> ValueMap {
    let mut map = HashMap::with_capacity(columns.len());
    for cell in row {
        if let Some(column) = columns.get(cell.column_index) {
            map.insert(column.name.clone(), cell.value);
        }
    }
    map
}

/// Render a row into a name-keyed map of canonical strings.
pub fn row_to_string_map(columns: &[ColumnInfo], row: &Row) -> Result<StringMap> {
    let mut map = HashMap::with_capacity(columns.len());
    for cell in row {
        let Some(column) = columns.get(cell.column_index) else {
            continue;
        };
        let rendered = value_to_string(&column.name, &cell.value)?;
        map.insert(column.name.clone(), rendered);
    }
    Ok(map)
}

/// Convert every row of a result set into generic-value maps.
pub fn rows_to_value_maps(result: ResultSet) -> Vec<ValueMap> {
    let ResultSet { columns, rows } = result;
    rows.into_iter()
        .map(|row| row_to_value_map(&columns, row))
        .collect()
}

/// Convert every row of a result set into string maps, stopping at the first failure.
pub fn rows_to_string_maps(result: &ResultSet) -> Result<Vec<StringMap>> {
    result
        .rows
        .iter()
        .map(|row| row_to_string_map(&result.columns, row))
        .collect()
}
