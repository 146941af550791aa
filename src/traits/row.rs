//! Backend-agnostic row and value types.
//!
//! This module contains:
//! - `Value` - A unified value type every driver normalizes its native values into
//! - `Cell` - A cell in a result row
//! - `Row` - A row of cells from a result set
//! - `ColumnInfo` - Metadata about a column in a result set
//! - `ResultSet` - Ordered columns and rows returned by a query

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unified value type that can represent any scanned or bound value.
///
/// Drivers normalize their wire types into this enum before the row codec runs,
/// and statement arguments are passed to drivers in the same representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// NULL value
    #[default]
    Null,

    /// Boolean value (true/false)
    Bool(bool),

    // Signed integers
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),

    // Unsigned integers (common in MySQL, ClickHouse)
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),

    // Floating point
    Float32(f32),
    Float64(f64),

    /// Text/string value
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),

    // Temporal types
    /// Date without time
    Date(NaiveDate),
    /// Time without date
    Time(NaiveTime),
    /// Date and time without timezone
    DateTime(NaiveDateTime),
    /// Date and time with timezone (stored as UTC)
    DateTimeTz(DateTime<Utc>),

    /// Decimal/numeric with arbitrary precision
    Decimal(Decimal),
    /// UUID
    Uuid(Uuid),
    /// JSON value
    Json(serde_json::Value),

    /// Array of values (ClickHouse `Array(T)`)
    Array(Vec<Value>),

    /// Backend type without a dedicated variant, carried as its textual form.
    Other {
        /// The backend-specific type name
        type_name: String,
        /// Best-effort string representation
        display: String,
    },

    /// A scanned value the driver could not normalize.
    Unsupported {
        /// The backend-specific type name
        type_name: String,
    },
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name for diagnostics
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::DateTimeTz(_) => "datetimetz",
            Value::Decimal(_) => "decimal",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Other { type_name, .. } => type_name,
            Value::Unsupported { type_name } => type_name,
        }
    }

    /// Try to extract as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to extract as an i64 (widens smaller integers, narrows u64 when it fits)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::UInt8(v) => Some(*v as i64),
            Value::UInt16(v) => Some(*v as i64),
            Value::UInt32(v) => Some(*v as i64),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to extract as a u64 (non-negative integers only)
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt8(v) => Some(*v as u64),
            Value::UInt16(v) => Some(*v as u64),
            Value::UInt32(v) => Some(*v as u64),
            Value::UInt64(v) => Some(*v),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    /// Try to extract as an f64 (will convert f32)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to extract as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to extract as bytes reference
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<Utc> => DateTimeTz,
    Decimal => Decimal,
    Uuid => Uuid,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// A row waiting to be written: column name to value.
///
/// Field order taken from a mapping is the map's key order.
pub type UnsavedRow = BTreeMap<String, Value>;

/// Metadata about a column in a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Backend-specific type name
    pub type_name: String,
    /// Column position (0-indexed)
    pub ordinal: usize,
}

impl ColumnInfo {
    /// Create a new column info
    pub fn new(name: String, type_name: String, ordinal: usize) -> Self {
        Self {
            name,
            type_name,
            ordinal,
        }
    }
}

/// A cell in a result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// The value of this cell
    pub value: Value,
    /// The column index (0-indexed)
    pub column_index: usize,
}

impl Cell {
    pub fn new(value: Value, column_index: usize) -> Self {
        Self {
            value,
            column_index,
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// A row of cells in backend column order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Create a row from values (auto-assigns column indices)
    pub fn from_values(values: Vec<Value>) -> Self {
        let cells = values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| Cell::new(value, idx))
            .collect();
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Get a value by index
    pub fn get_value(&self, index: usize) -> Option<&Value> {
        self.cells.get(index).map(|c| &c.value)
    }

    /// Iterate over values
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|c| &c.value)
    }
}

impl IntoIterator for Row {
    type Item = Cell;
    type IntoIter = std::vec::IntoIter<Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

/// Rows returned by a query, in backend order, with their column metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in result order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of the last column carrying `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().rposition(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null_check() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());
        assert!(!Value::Int32(42).is_null());
        assert!(!Value::Text("hello".to_string()).is_null());
    }

    #[test]
    fn test_value_integer_accessors() {
        assert_eq!(Value::Int8(-3).as_i64(), Some(-3));
        assert_eq!(Value::UInt32(7).as_i64(), Some(7));
        assert_eq!(Value::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(Value::UInt64(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(Value::Int64(-1).as_u64(), None);
        assert_eq!(Value::Text("1".to_string()).as_i64(), None);
    }

    #[test]
    fn test_value_from_option() {
        let some_val: Value = Some(42i32).into();
        assert_eq!(some_val, Value::Int32(42));

        let none_val: Value = Option::<i32>::None.into();
        assert_eq!(none_val, Value::Null);
    }

    #[test]
    fn test_value_from_bytes_and_str() {
        assert_eq!(Value::from("a"), Value::Text("a".to_string()));
        assert_eq!(Value::from(&b"\x00"[..]), Value::Bytes(vec![0]));
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::UInt16(1).type_name(), "uint16");
        assert_eq!(Value::Uuid(Uuid::nil()).type_name(), "uuid");
        assert_eq!(
            Value::Unsupported {
                type_name: "GEOMETRY".to_string()
            }
            .type_name(),
            "GEOMETRY"
        );
    }

    #[test]
    fn test_row_from_values() {
        let row = Row::from_values(vec![
            Value::Int32(1),
            Value::Text("hello".to_string()),
            Value::Bool(true),
        ]);

        assert_eq!(row.len(), 3);
        assert_eq!(row.get_value(0), Some(&Value::Int32(1)));
        assert_eq!(row.get_value(2), Some(&Value::Bool(true)));
        assert_eq!(row.get_value(3), None);
    }

    #[test]
    fn test_result_set_column_index_prefers_last_duplicate() {
        let rs = ResultSet::new(
            vec![
                ColumnInfo::new("id".to_string(), "INT".to_string(), 0),
                ColumnInfo::new("name".to_string(), "TEXT".to_string(), 1),
                ColumnInfo::new("id".to_string(), "INT".to_string(), 2),
            ],
            vec![],
        );

        assert_eq!(rs.column_index("id"), Some(2));
        assert_eq!(rs.column_index("name"), Some(1));
        assert_eq!(rs.column_index("missing"), None);
        assert_eq!(rs.column_names(), vec!["id", "name", "id"]);
    }

    #[test]
    fn test_value_serialization_is_tagged() {
        let json = serde_json::to_string(&Value::Int64(5)).unwrap();
        assert_eq!(json, r#"{"type":"Int64","value":5}"#);
    }
}
