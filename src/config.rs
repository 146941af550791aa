//! Pool and transport settings shared by the built-in drivers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Connection-pool settings.
///
/// Built-in factories use [`PoolConfig::default`]; register a closure over
/// `connect_with` to open a backend with tuned settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long an operation waits for a free connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Server-side execution limit for HTTP backends (ClickHouse `max_execution_time`)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PoolConfig {
    /// Parse settings from a JSON document; absent keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::validation(format!("invalid pool config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::validation("max_connections must be at least 1"));
        }
        if self.acquire_timeout_secs == 0 {
            return Err(Error::validation("acquire_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}
