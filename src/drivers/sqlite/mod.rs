//! SQLite database driver implementation.
//!
//! This module provides a SQLite driver that implements the `Driver` trait
//! using SQLx.
//!
//! SQLite is a file-based embedded database that supports:
//! - File-based databases (`sqlite://data.db`)
//! - In-memory databases (`sqlite::memory:`)
//!
//! # Example
//!
//! ```ignore
//! use simpledb::drivers::sqlite::SqliteDriver;
//! use simpledb::PoolConfig;
//!
//! let db = SqliteDriver::connect_with("sqlite://app.db", &PoolConfig::default())?;
//! let columns = db.get_table_columns("users")?;
//! ```

mod connection;
mod types;

pub use connection::SqliteDriver;
