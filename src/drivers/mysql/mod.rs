//! MySQL database driver implementation.
//!
//! This module provides a MySQL driver that implements the `Driver` trait
//! using SQLx. MariaDB servers speak the same protocol and work unchanged.

mod connection;
mod types;

pub use connection::MySqlDriver;
