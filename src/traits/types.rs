//! Built-in backend kinds.
//!
//! This module contains:
//! - `DriverKind` - Enum of the backends shipped with the crate

use serde::{Deserialize, Serialize};

/// Backends with a built-in driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    MySql,
    Sqlite,
    ClickHouse,
}

impl DriverKind {
    /// Registry name of this backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::ClickHouse => "clickhouse",
        }
    }

    /// Get the display name for this backend
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
            Self::ClickHouse => "ClickHouse",
        }
    }

    /// Built-in kind registered under `name`, if any
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::MySql, Self::Sqlite, Self::ClickHouse]
            .into_iter()
            .find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
