//! ClickHouse driver implementation.
//!
//! This module implements the `Driver` trait for ClickHouse over its HTTP
//! interface. Every call is one POST carrying the SQL text as the body;
//! results are requested as `JSONCompact`.
//!
//! ClickHouse supports multiple interfaces:
//! - HTTP (default port 8123) - used here for simplicity and JSON support
//! - Native TCP (port 9000) - binary protocol, not spoken by this driver
//!
//! `tcp://` and `clickhouse://` DSNs are accepted and redirected to HTTP.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use url::Url;

use super::types::{render_sql, ClickHouseValueConverter};
use crate::builder::{quote_table, split_table};
use crate::codec;
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::traits::{
    BoxedDriver, Driver, DriverKind, ExecOutcome, PreparedStatement, ResultSet, Value,
};

const HTTP_PORT: u16 = 8123;
const HTTPS_PORT: u16 = 8443;
const NATIVE_PORT: u16 = 9000;

const TABLE_COLUMNS_SQL: &str = "SELECT name FROM system.columns \
     WHERE database = coalesce(?, currentDatabase()) AND table = ? \
     ORDER BY position";

const EXCEPTION_CODE_HEADER: &str = "X-ClickHouse-Exception-Code";

/// Where and as whom to send requests.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct ClickHouseEndpoint {
    base_url: Url,
    username: String,
    password: String,
    database: String,
    max_execution_time: u64,
}

impl std::fmt::Debug for ClickHouseEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseEndpoint")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl ClickHouseEndpoint {
    /// Parse a DSN.
    ///
    /// Credentials come from the userinfo or the `username`/`password` query
    /// keys; the database from the path or the `database` key.
    pub(crate) fn parse(dsn: &str, config: &PoolConfig) -> Result<Self> {
        let url = Url::parse(dsn).map_err(|e| Error::connection(anyhow!("invalid ClickHouse DSN: {}", e)))?;

        let (scheme, default_port) = match url.scheme() {
            "http" => ("http", HTTP_PORT),
            "https" => ("https", HTTPS_PORT),
            "clickhouse" | "tcp" => ("http", HTTP_PORT),
            other => {
                return Err(Error::connection(anyhow!(
                    "unsupported ClickHouse DSN scheme `{}`",
                    other
                )));
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::connection(anyhow!("ClickHouse DSN has no host")))?;

        let port = match url.port() {
            // a native-protocol port cannot serve HTTP
            Some(NATIVE_PORT) if scheme == "http" && url.scheme() != "http" => default_port,
            Some(port) => port,
            None => default_port,
        };

        let mut username = percent_decode(url.username());
        let mut password = url.password().map(percent_decode).unwrap_or_default();
        let mut database = percent_decode(url.path().trim_matches('/'));

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "username" | "user" if username.is_empty() => username = value.into_owned(),
                "password" if password.is_empty() => password = value.into_owned(),
                "database" if database.is_empty() => database = value.into_owned(),
                _ => {}
            }
        }

        if username.is_empty() {
            username = "default".to_string();
        }
        if database.is_empty() {
            database = "default".to_string();
        }

        let base_url = Url::parse(&format!("{}://{}:{}/", scheme, host, port))
            .map_err(|e| Error::connection(anyhow!("invalid ClickHouse address: {}", e)))?;

        Ok(Self {
            base_url,
            username,
            password,
            database,
            max_execution_time: config.request_timeout_secs,
        })
    }

    /// Request URL carrying the session settings
    fn request_url(&self) -> String {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("database", &self.database)
            .append_pair("default_format", "JSONCompact")
            .append_pair("output_format_json_quote_64bit_integers", "0")
            .append_pair("max_execution_time", &self.max_execution_time.to_string());
        url.into()
    }

    /// POST one statement and return the response body.
    fn post(&self, sql: &str) -> Result<String> {
        tracing::trace!(sql, "clickhouse request");
        let response = smolhttp::Client::new(&self.request_url())
            .map_err(|e| Error::connection(anyhow!("Failed to create HTTP client: {}", e)))?
            .post()
            .headers(vec![
                ("X-ClickHouse-User".to_string(), self.username.clone()),
                ("X-ClickHouse-Key".to_string(), self.password.clone()),
                ("Content-Type".to_string(), "text/plain".to_string()),
            ])
            .body(sql.as_bytes().to_vec())
            .send()
            .map_err(|e| Error::connection(anyhow!("HTTP request failed: {}", e)))?;

        let body = String::from_utf8_lossy(&response.content()).into_owned();
        check_response(response.status_code(), &response.headers(), body)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecOutcome> {
        self.post(&render_sql(sql, args)?)?;
        Ok(ExecOutcome::unreported())
    }
}

/// Turn a failed HTTP exchange into a query error.
///
/// The server marks failures with a non-200 status or an
/// `X-ClickHouse-Exception-Code` header; result rows may contain exception
/// text of their own, so a 200 body is never inspected.
fn check_response(
    status: usize,
    headers: &HashMap<String, String>,
    body: String,
) -> Result<String> {
    let exception_code = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(EXCEPTION_CODE_HEADER))
        .map(|(_, code)| code.trim());

    if status == 200 && exception_code.is_none() {
        return Ok(body);
    }

    let message = body.trim();
    Err(Error::query(match exception_code {
        Some(code) => anyhow!("ClickHouse error (code {}, HTTP {}): {}", code, status, message),
        None => anyhow!("ClickHouse error (HTTP {}): {}", status, message),
    }))
}

/// Percent-decode a userinfo or path component.
fn percent_decode(raw: &str) -> String {
    let escaped = format!("v={}", raw.replace('+', "%2B").replace('&', "%26"));
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

/// ClickHouse database driver.
///
/// Uses the HTTP interface. There is no connection pool: each call is an
/// independent request, so `close` only marks the handle unusable.
/// Inserts report neither an identity value nor an affected-row count.
pub struct ClickHouseDriver {
    endpoint: ClickHouseEndpoint,
    closed: AtomicBool,
}

impl std::fmt::Debug for ClickHouseDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseDriver")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl ClickHouseDriver {
    /// Registry factory: open with the default settings.
    pub fn open(dsn: &str) -> Result<BoxedDriver> {
        Ok(Box::new(Self::connect_with(dsn, &PoolConfig::default())?))
    }

    /// Parse `dsn` and verify the server answers `SELECT 1`.
    pub fn connect_with(dsn: &str, config: &PoolConfig) -> Result<Self> {
        config.validate()?;

        let driver = Self {
            endpoint: ClickHouseEndpoint::parse(dsn, config)?,
            closed: AtomicBool::new(false),
        };
        driver.ping()?;
        tracing::debug!(endpoint = ?driver.endpoint, "clickhouse endpoint verified");

        Ok(driver)
    }

    fn endpoint(&self) -> Result<&ClickHouseEndpoint> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::connection(anyhow!("ClickHouse handle is closed")));
        }
        Ok(&self.endpoint)
    }
}

impl Driver for ClickHouseDriver {
    fn driver_name(&self) -> &str {
        DriverKind::ClickHouse.as_str()
    }

    fn ping(&self) -> Result<()> {
        let body = self.endpoint()?.post("SELECT 1").map_err(|e| match e {
            Error::Query(source) => Error::Connection(source),
            other => other,
        })?;
        ClickHouseValueConverter::parse_json_compact(&body).map_err(|e| match e {
            Error::Query(source) => Error::Connection(source),
            other => other,
        })?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!("clickhouse handle closed");
        Ok(())
    }

    fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecOutcome> {
        self.endpoint()?.execute(sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> Result<ResultSet> {
        let body = self.endpoint()?.post(&render_sql(sql, args)?)?;
        ClickHouseValueConverter::parse_json_compact(&body)
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        Ok(Box::new(ClickHousePrepared {
            endpoint: self.endpoint()?.clone(),
            sql: sql.to_string(),
        }))
    }

    fn get_table_columns(&self, table: &str) -> Result<Vec<String>> {
        let (schema, name) = split_table(table);
        let args = [Value::from(schema), Value::from(name)];
        self.query_field_values("name", TABLE_COLUMNS_SQL, &args)?
            .iter()
            .map(|value| codec::value_to_string("name", value))
            .collect()
    }

    fn copy_table(&self, src: &str, dst: &str) -> Result<()> {
        self.execute(
            &format!("CREATE TABLE {} AS {}", quote_table(dst), quote_table(src)),
            &[],
        )?;
        Ok(())
    }
}

/// Statement text kept client-side; arguments are rendered per execution.
struct ClickHousePrepared {
    endpoint: ClickHouseEndpoint,
    sql: String,
}

impl PreparedStatement for ClickHousePrepared {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute(&mut self, args: &[Value]) -> Result<ExecOutcome> {
        self.endpoint.execute(&self.sql, args)
    }
}
