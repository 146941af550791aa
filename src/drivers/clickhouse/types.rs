//! ClickHouse type conversion utilities.
//!
//! This module handles conversion between ClickHouse values and the generic
//! `Value` type, in both directions:
//!
//! - Results arrive as `JSONCompact` documents and are decoded by the column's
//!   ClickHouse type name.
//! - Arguments are rendered into SQL literals, since the HTTP interface has no
//!   positional parameters.
//!
//! ClickHouse has a rich type system including:
//! - UInt8, UInt16, UInt32, UInt64, UInt128, UInt256
//! - Int8, Int16, Int32, Int64, Int128, Int256
//! - Float32, Float64
//! - Decimal(P, S)
//! - String, FixedString(N)
//! - Date, Date32, DateTime, DateTime64
//! - UUID
//! - Array(T), Nullable(T), Tuple(...)
//! - Enum8, Enum16
//! - LowCardinality(T)

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::traits::{Cell, ColumnInfo, ResultSet, Row as TraitRow, Value};

/// Converter for ClickHouse JSON values to the unified `Value` type.
pub struct ClickHouseValueConverter;

impl ClickHouseValueConverter {
    /// Parse a `JSONCompact` response body into a result set.
    ///
    /// Statements that produce no result set answer with an empty body.
    pub fn parse_json_compact(body: &str) -> Result<ResultSet> {
        if body.trim().is_empty() {
            return Ok(ResultSet::default());
        }

        let json: JsonValue = serde_json::from_str(body)
            .map_err(|e| Error::query(anyhow!("Failed to parse ClickHouse response: {}", e)))?;

        let columns = json
            .get("meta")
            .and_then(|m| m.as_array())
            .map(|meta| Self::parse_columns_from_meta(meta))
            .unwrap_or_default();

        let rows = json
            .get("data")
            .and_then(|d| d.as_array())
            .map(|data| {
                data.iter()
                    .map(|row| Self::convert_json_row(row, &columns))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ResultSet::new(columns, rows))
    }

    /// Parse column metadata from the `meta` section of a response.
    pub fn parse_columns_from_meta(meta: &[JsonValue]) -> Vec<ColumnInfo> {
        meta.iter()
            .enumerate()
            .filter_map(|(idx, m)| {
                let name = m.get("name")?.as_str()?.to_string();
                let type_name = m.get("type")?.as_str()?.to_string();
                Some(ColumnInfo::new(name, type_name, idx))
            })
            .collect()
    }

    /// Convert one positional JSON row to a trait Row.
    fn convert_json_row(json_row: &JsonValue, columns: &[ColumnInfo]) -> TraitRow {
        let cells = json_row
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .enumerate()
                    .map(|(idx, val)| {
                        let type_name = columns
                            .get(idx)
                            .map(|c| c.type_name.as_str())
                            .unwrap_or("String");
                        Cell::new(Self::json_to_value(val, type_name), idx)
                    })
                    .collect()
            })
            .unwrap_or_default();

        TraitRow::new(cells)
    }

    /// Convert a JSON value to our unified Value type.
    ///
    /// Uses the ClickHouse type name to guide conversion.
    pub fn json_to_value(json: &JsonValue, type_name: &str) -> Value {
        let inner = inner_type(type_name);
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Self::convert_number(n, &inner),
            JsonValue::String(s) => Self::convert_string(s, &inner),
            JsonValue::Array(arr) => Self::convert_array(arr, &inner),
            JsonValue::Object(_) => Value::Json(json.clone()),
        }
    }

    /// Convert a JSON number based on the ClickHouse type.
    fn convert_number(n: &serde_json::Number, inner: &str) -> Value {
        let converted = match inner {
            "uint8" => n.as_u64().and_then(|v| u8::try_from(v).ok()).map(Value::UInt8),
            "uint16" => n.as_u64().and_then(|v| u16::try_from(v).ok()).map(Value::UInt16),
            "uint32" => n.as_u64().and_then(|v| u32::try_from(v).ok()).map(Value::UInt32),
            "uint64" => n.as_u64().map(Value::UInt64),
            "int8" => n.as_i64().and_then(|v| i8::try_from(v).ok()).map(Value::Int8),
            "int16" => n.as_i64().and_then(|v| i16::try_from(v).ok()).map(Value::Int16),
            "int32" => n.as_i64().and_then(|v| i32::try_from(v).ok()).map(Value::Int32),
            "int64" => n.as_i64().map(Value::Int64),
            "float32" => n.as_f64().map(|v| Value::Float32(v as f32)),
            "float64" => n.as_f64().map(Value::Float64),
            "bool" => n.as_u64().map(|v| Value::Bool(v != 0)),
            _ if inner.starts_with("decimal") => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok()
                .map(Value::Decimal),
            _ => None,
        };

        converted.unwrap_or_else(|| {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt64(u)
            } else {
                n.as_f64().map(Value::Float64).unwrap_or(Value::Null)
            }
        })
    }

    /// Convert a JSON string based on the ClickHouse type.
    ///
    /// 64-bit and wider integers may be quoted by the server.
    fn convert_string(s: &str, inner: &str) -> Value {
        let parsed = match inner {
            "int64" => s.parse().ok().map(Value::Int64),
            "uint64" => s.parse().ok().map(Value::UInt64),
            "float32" => s.parse().ok().map(Value::Float32),
            "float64" => s.parse().ok().map(Value::Float64),
            "uuid" => uuid::Uuid::parse_str(s).ok().map(Value::Uuid),
            "date" | "date32" => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Value::Date),
            _ if inner.starts_with("datetime") => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(Value::DateTime),
            _ if inner.starts_with("decimal") => Decimal::from_str(s).ok().map(Value::Decimal),
            "int128" | "int256" | "uint128" | "uint256" => Some(Value::Other {
                type_name: inner.to_string(),
                display: s.to_string(),
            }),
            _ => None,
        };

        parsed.unwrap_or_else(|| Value::Text(s.to_string()))
    }

    /// Convert a JSON array based on the ClickHouse type.
    fn convert_array(arr: &[JsonValue], inner: &str) -> Value {
        let element_type = inner
            .strip_prefix("array(")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or("string");

        Value::Array(
            arr.iter()
                .map(|v| Self::json_to_value(v, element_type))
                .collect(),
        )
    }
}

/// Lowercased type name with `Nullable(..)` and `LowCardinality(..)` removed.
fn inner_type(type_name: &str) -> String {
    let mut inner = type_name.trim().to_lowercase();
    loop {
        let unwrapped = ["nullable(", "lowcardinality("].iter().find_map(|prefix| {
            inner
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(')'))
                .map(str::to_string)
        });
        match unwrapped {
            Some(next) => inner = next,
            None => return inner,
        }
    }
}

/// Quote a string literal, escaping backslashes and single quotes.
fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Render one argument as a ClickHouse SQL literal.
pub(crate) fn literal(value: &Value) -> Result<String> {
    let rendered = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int8(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::UInt8(v) => v.to_string(),
        Value::UInt16(v) => v.to_string(),
        Value::UInt32(v) => v.to_string(),
        Value::UInt64(v) => v.to_string(),
        Value::Float32(v) => float_literal(*v as f64),
        Value::Float64(v) => float_literal(*v),
        Value::Text(s) => quote_string(s),
        Value::Bytes(b) => format!("unhex('{}')", hex::encode(b)),
        Value::Date(d) => quote_string(&d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => quote_string(&t.format("%H:%M:%S%.f").to_string()),
        Value::DateTime(dt) => quote_string(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::DateTimeTz(dt) => quote_string(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::Decimal(d) => d.to_string(),
        Value::Uuid(u) => quote_string(&u.to_string()),
        Value::Json(j) => quote_string(&j.to_string()),
        Value::Array(items) => {
            let rendered = items.iter().map(literal).collect::<Result<Vec<_>>>()?;
            format!("[{}]", rendered.join(", "))
        }
        Value::Other { display, .. } => quote_string(display),
        Value::Unsupported { type_name } => {
            return Err(Error::query(anyhow!(
                "ClickHouse cannot bind a {} argument",
                type_name
            )));
        }
    };

    Ok(rendered)
}

fn float_literal(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v == f64::INFINITY {
        "inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        v.to_string()
    }
}

/// Scanner position inside statement text.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Substitute `?` placeholders with rendered literals.
///
/// Placeholders inside quoted strings, quoted identifiers, backtick
/// identifiers and `--` or `/* */` comments are left alone. The number of
/// placeholders must equal the number of arguments. A statement run without
/// arguments is sent unchanged, so the `cond ? a : b` operator is only
/// usable then; with arguments, write `if(cond, a, b)`.
pub(crate) fn render_sql(sql: &str, args: &[Value]) -> Result<String> {
    if args.is_empty() {
        return Ok(sql.to_string());
    }

    let mut out = String::with_capacity(sql.len() + args.len() * 8);
    let mut args_iter = args.iter();
    let mut state = Lexeme::Code;
    let mut escaped = false;
    let mut used = 0usize;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            Lexeme::Quoted(q) => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    state = Lexeme::Code;
                }
                out.push(ch);
            }
            Lexeme::LineComment => {
                if ch == '\n' {
                    state = Lexeme::Code;
                }
                out.push(ch);
            }
            Lexeme::BlockComment => {
                out.push(ch);
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push('/');
                    state = Lexeme::Code;
                }
            }
            Lexeme::Code => match ch {
                '\'' | '"' | '`' => {
                    state = Lexeme::Quoted(ch);
                    out.push(ch);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    out.push_str("--");
                    state = Lexeme::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("/*");
                    state = Lexeme::BlockComment;
                }
                '?' => {
                    let Some(arg) = args_iter.next() else {
                        return Err(Error::query(anyhow!(
                            "statement has more placeholders than the {} arguments given",
                            args.len()
                        )));
                    };
                    out.push_str(&literal(arg)?);
                    used += 1;
                }
                _ => out.push(ch),
            },
        }
    }

    if used != args.len() {
        return Err(Error::query(anyhow!(
            "statement has {} placeholders but {} arguments were given",
            used,
            args.len()
        )));
    }

    Ok(out)
}
