//! Backend driver implementations.
//!
//! This module contains driver implementations for the built-in backends:
//!
//! - **MySQL**: MySQL/MariaDB support via SQLx
//! - **SQLite**: Embedded SQLite support via SQLx
//! - **ClickHouse**: ClickHouse analytics database support over HTTP
//!
//! Each driver implements the `Driver` trait and is reachable by name through
//! the [`DriverRegistry`].

pub mod clickhouse;
pub mod mysql;
mod registry;
pub mod sqlite;

pub use clickhouse::ClickHouseDriver;
pub use mysql::MySqlDriver;
pub use registry::{DriverFactory, DriverRegistry};
pub use sqlite::SqliteDriver;
