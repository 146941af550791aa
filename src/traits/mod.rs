//! Backend abstraction traits and types.
//!
//! This module provides a unified interface for interacting with different backends.
//! It defines:
//!
//! - **Types** (`types`): Built-in backend kinds
//! - **Row/Value** (`row`): Backend-agnostic value representation
//! - **Connection** (`connection`): Core driver trait, prepared statements and exec outcomes

pub mod connection;
pub mod row;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-export commonly used types
pub use connection::{BoxedDriver, Driver, ExecOutcome, PreparedStatement};

pub use row::{Cell, ColumnInfo, ResultSet, Row, UnsavedRow, Value};

pub use types::DriverKind;
