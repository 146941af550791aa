//! Uniform data access over MySQL, SQLite and ClickHouse.
//!
//! - **Registry** (`drivers`): open a backend by name and connection string
//! - **Driver** (`traits`): one blocking handle surface for statements, DDL
//!   helpers, bulk inserts and keyed bulk updates
//! - **Codec** (`codec`): scanned rows as maps of generic values or canonical strings
//! - **Builder** (`builder`): parameterized INSERT/UPDATE text for the three input shapes
//!
//! # Example
//!
//! ```ignore
//! use simpledb::{DriverRegistry, UnsavedRow, Value};
//!
//! let db = DriverRegistry::open("sqlite", "sqlite::memory:")?;
//! db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
//!
//! let mut row = UnsavedRow::new();
//! row.insert("name".to_string(), Value::from("a"));
//! let outcome = db.insert_from_map("users", &row)?;
//!
//! let user = db.query_string_row(
//!     "SELECT * FROM users WHERE id = ?",
//!     &[Value::from(outcome.last_insert_id)],
//! )?;
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod drivers;
pub mod error;
pub mod traits;

pub use codec::{StringMap, ValueMap};
pub use config::PoolConfig;
pub use drivers::{DriverFactory, DriverRegistry};
pub use error::{Error, Result};
pub use traits::{
    BoxedDriver, Cell, ColumnInfo, Driver, DriverKind, ExecOutcome, PreparedStatement, ResultSet,
    Row, UnsavedRow, Value,
};
