//! ClickHouse database driver implementation.
//!
//! This module provides a ClickHouse driver that implements the `Driver`
//! trait over the HTTP interface.
//!
//! # Example
//!
//! ```ignore
//! use simpledb::DriverRegistry;
//!
//! let db = DriverRegistry::open("clickhouse", "tcp://127.0.0.1:9000?database=logs&username=default")?;
//! db.bulk_insert_from_slice_slice("events", &["id", "kind"], &rows)?;
//! ```

mod connection;
mod types;

pub use connection::ClickHouseDriver;
