//! SQLite driver implementation.
//!
//! This module implements the `Driver` trait for SQLite using SQLx's
//! SqlitePool. Calls block on the pool through `smol::block_on`.

use std::str::FromStr;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions, SqliteStatement};
use sqlx::{Executor, SqlitePool, Statement as _};

use super::types::{bind_all, SqliteValueConverter};
use crate::builder::{quote_table, split_table};
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::traits::{
    BoxedDriver, Driver, DriverKind, ExecOutcome, PreparedStatement, ResultSet, Row, Value,
};

/// SQLite database driver.
///
/// Accepts sqlx connection strings (`sqlite://path/to.db`, `sqlite::memory:`).
/// The database file is created when missing. An in-memory database lives on a
/// single pooled connection that is never recycled, so its contents survive
/// between calls.
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl SqliteDriver {
    /// Registry factory: open with the default pool settings.
    pub fn open(dsn: &str) -> Result<BoxedDriver> {
        Ok(Box::new(Self::connect_with(dsn, &PoolConfig::default())?))
    }

    /// Open a pool for `dsn` with explicit pool settings.
    pub fn connect_with(dsn: &str, config: &PoolConfig) -> Result<Self> {
        config.validate()?;

        let options = SqliteConnectOptions::from_str(dsn)
            .map_err(Error::connection)?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout());
        if Self::is_in_memory(dsn) {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(config.max_connections);
        }

        let pool = smol::block_on(pool_options.connect_with(options)).map_err(Error::connection)?;
        tracing::debug!(dsn, "sqlite pool opened");

        Ok(Self { pool })
    }

    fn is_in_memory(dsn: &str) -> bool {
        dsn.contains(":memory:") || dsn.contains("mode=memory")
    }
}

impl Driver for SqliteDriver {
    fn driver_name(&self) -> &str {
        DriverKind::Sqlite.as_str()
    }

    fn ping(&self) -> Result<()> {
        smol::block_on(sqlx::query("SELECT 1").fetch_one(&self.pool)).map_err(Error::connection)?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        smol::block_on(self.pool.close());
        tracing::debug!("sqlite pool closed");
        Ok(())
    }

    fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecOutcome> {
        tracing::trace!(sql, args = args.len(), "sqlite execute");
        let query = bind_all(sqlx::query(sql), args)?;
        let result = smol::block_on(query.execute(&self.pool)).map_err(Error::query)?;

        Ok(ExecOutcome::new(
            Some(result.last_insert_rowid()),
            Some(result.rows_affected()),
        ))
    }

    fn query(&self, sql: &str, args: &[Value]) -> Result<ResultSet> {
        tracing::trace!(sql, args = args.len(), "sqlite query");
        let query = bind_all(sqlx::query(sql), args)?;
        let sqlite_rows = smol::block_on(query.fetch_all(&self.pool)).map_err(Error::query)?;

        let columns = sqlite_rows
            .first()
            .map(SqliteValueConverter::build_column_info)
            .unwrap_or_default();
        let rows: Vec<Row> = sqlite_rows
            .iter()
            .map(SqliteValueConverter::convert_row)
            .collect();

        Ok(ResultSet::new(columns, rows))
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        tracing::trace!(sql, "sqlite prepare");
        let prepared = smol::block_on(async {
            let mut conn = self.pool.acquire().await?;
            let statement = (&mut *conn).prepare(sql).await?;
            let statement = sqlx::Statement::to_owned(&statement);
            Ok::<_, sqlx::Error>(SqlitePrepared { conn, statement })
        })
        .map_err(Error::query)?;

        Ok(Box::new(prepared))
    }

    fn get_table_columns(&self, table: &str) -> Result<Vec<String>> {
        let result = match split_table(table) {
            (Some(schema), name) => self.query(
                "SELECT name FROM pragma_table_info(?, ?) ORDER BY cid",
                &[Value::from(name), Value::from(schema)],
            )?,
            (None, name) => self.query(
                "SELECT name FROM pragma_table_info(?) ORDER BY cid",
                &[Value::from(name)],
            )?,
        };

        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.get_value(0).and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    fn truncate(&self, table: &str) -> Result<()> {
        self.execute(&format!("DELETE FROM {}", quote_table(table)), &[])?;
        Ok(())
    }

    fn copy_table(&self, src: &str, dst: &str) -> Result<()> {
        self.execute(
            &format!(
                "CREATE TABLE {} AS SELECT * FROM {} WHERE 0",
                quote_table(dst),
                quote_table(src)
            ),
            &[],
        )?;
        Ok(())
    }
}

/// A statement prepared on one pooled connection, held until dropped.
struct SqlitePrepared {
    conn: PoolConnection<Sqlite>,
    statement: SqliteStatement<'static>,
}

impl PreparedStatement for SqlitePrepared {
    fn sql(&self) -> &str {
        self.statement.sql()
    }

    fn execute(&mut self, args: &[Value]) -> Result<ExecOutcome> {
        let query = bind_all(self.statement.query(), args)?;
        let result = smol::block_on(query.execute(&mut *self.conn)).map_err(Error::query)?;

        Ok(ExecOutcome::new(
            Some(result.last_insert_rowid()),
            Some(result.rows_affected()),
        ))
    }
}
