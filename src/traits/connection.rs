//! Core driver traits.
//!
//! This module defines the `Driver` trait every backend implements, the
//! `PreparedStatement` handle used by batched updates, and `ExecOutcome`.
//!
//! Backends implement a small required surface (`execute`, `query`, `prepare`,
//! column listing and lifecycle). Inserts, updates by key and the map-shaped
//! query helpers are provided on top of it and may be overridden where a
//! dialect differs.

use serde::{Deserialize, Serialize};

use super::row::{ResultSet, UnsavedRow, Value};
use super::types::DriverKind;
use crate::builder::{self, quote_table, UpdatePlan};
use crate::codec::{self, StringMap, ValueMap};
use crate::error::{Error, Result};

/// Result of executing a statement that returns no rows.
///
/// Both fields are optional: append-only engines report neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecOutcome {
    /// Identity value generated by the last insert
    pub last_insert_id: Option<i64>,
    /// Number of rows affected
    pub rows_affected: Option<u64>,
}

impl ExecOutcome {
    pub fn new(last_insert_id: Option<i64>, rows_affected: Option<u64>) -> Self {
        Self {
            last_insert_id,
            rows_affected,
        }
    }

    /// Outcome for backends that report nothing
    pub fn unreported() -> Self {
        Self::default()
    }

    /// Fold a later outcome into this one: counts add up, the later identity wins.
    pub fn merge(self, later: ExecOutcome) -> Self {
        let rows_affected = match (self.rows_affected, later.rows_affected) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
        };
        Self {
            last_insert_id: later.last_insert_id.or(self.last_insert_id),
            rows_affected,
        }
    }
}

/// A parsed, parameterized statement reused across executions.
///
/// Dropping the handle releases the statement and anything it pins (such as a
/// pooled connection).
pub trait PreparedStatement: Send {
    /// SQL text this statement was prepared from
    fn sql(&self) -> &str;

    /// Execute once with positional arguments.
    fn execute(&mut self, args: &[Value]) -> Result<ExecOutcome>;
}

/// Core trait for all backend drivers.
///
/// Calls block the current thread until the backend answers. A handle owns its
/// connection pool; call [`Driver::close`] when done with it.
///
/// # Example
///
/// ```ignore
/// use simpledb::{DriverRegistry, Value};
///
/// let db = DriverRegistry::open("sqlite", "sqlite::memory:")?;
/// db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
/// db.insert_from_slice("t", &["name"], &[Value::from("a")])?;
/// let row = db.query_string_row("SELECT name FROM t", &[])?;
/// ```
pub trait Driver: Send + Sync {
    /// Backend name of this handle, as registered
    fn driver_name(&self) -> &str;

    /// Built-in backend kind; `None` for caller-registered drivers.
    fn kind(&self) -> Option<DriverKind> {
        DriverKind::from_name(self.driver_name())
    }

    /// Round-trip to the backend to verify it is reachable.
    fn ping(&self) -> Result<()>;

    /// Release the underlying pool. Later calls on this handle fail.
    fn close(&self) -> Result<()>;

    /// Run a statement that returns no rows.
    fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecOutcome>;

    /// Run a statement and collect every row it returns.
    fn query(&self, sql: &str, args: &[Value]) -> Result<ResultSet>;

    /// Prepare a statement for repeated execution.
    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>>;

    /// Column names of `table`, in table order.
    fn get_table_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Remove every row of `table`.
    fn truncate(&self, table: &str) -> Result<()> {
        self.execute(&format!("TRUNCATE TABLE {}", quote_table(table)), &[])?;
        Ok(())
    }

    /// Drop `table` if it exists.
    fn drop_table(&self, table: &str) -> Result<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", quote_table(table)), &[])?;
        Ok(())
    }

    /// Create `dst` with the structure of `src`; no rows are copied.
    fn copy_table(&self, src: &str, dst: &str) -> Result<()> {
        self.execute(
            &format!("CREATE TABLE {} LIKE {}", quote_table(dst), quote_table(src)),
            &[],
        )?;
        Ok(())
    }

    fn insert_from_slice(&self, table: &str, fields: &[&str], values: &[Value]) -> Result<ExecOutcome> {
        let stmt = builder::insert(table, fields, values)?;
        self.execute(&stmt.sql, &stmt.args)
    }

    fn insert_from_map(&self, table: &str, row: &UnsavedRow) -> Result<ExecOutcome> {
        let stmt = builder::insert_from_map(table, row)?;
        self.execute(&stmt.sql, &stmt.args)
    }

    /// Insert every row in one multi-row statement.
    fn bulk_insert_from_slice_slice(
        &self,
        table: &str,
        fields: &[&str],
        rows: &[Vec<Value>],
    ) -> Result<ExecOutcome> {
        let stmt = builder::bulk_insert_from_slices(table, fields, rows)?;
        tracing::debug!(table, rows = rows.len(), "bulk insert from slices");
        self.execute(&stmt.sql, &stmt.args)
    }

    /// Insert every row in one multi-row statement; columns come from the first row.
    fn bulk_insert_from_slice_map(&self, table: &str, rows: &[UnsavedRow]) -> Result<ExecOutcome> {
        let stmt = builder::bulk_insert_from_maps(table, rows)?;
        tracing::debug!(table, rows = rows.len(), "bulk insert from maps");
        self.execute(&stmt.sql, &stmt.args)
    }

    /// Insert rows in chunks of `batch_size`, one statement per chunk.
    ///
    /// Each chunk takes its column set from its own first row. Chunks already
    /// written stay written when a later chunk fails.
    fn bulk_insert_from_slice_map_in_batches(
        &self,
        table: &str,
        rows: &[UnsavedRow],
        batch_size: usize,
    ) -> Result<ExecOutcome> {
        if batch_size == 0 {
            return Err(Error::validation(format!(
                "table[{}] batch size must be at least 1",
                table
            )));
        }
        if rows.is_empty() {
            return Err(Error::empty_batch(table, "insert"));
        }

        let mut outcome = ExecOutcome::unreported();
        for chunk in rows.chunks(batch_size) {
            outcome = outcome.merge(self.bulk_insert_from_slice_map(table, chunk)?);
        }
        Ok(outcome)
    }

    /// Update the row whose `key` column matches `row[key]`.
    fn update_from_map_by_id(&self, table: &str, key: &str, row: &UnsavedRow) -> Result<ExecOutcome> {
        let plan = UpdatePlan::new(table, key, row)?;
        let args = plan.bind(row)?;
        self.execute(plan.sql(), &args)
    }

    /// Update many rows by key through one prepared statement.
    ///
    /// The SET list is fixed by the first row. Rows run in order; the first
    /// failure stops the batch and is returned, and rows before it stay
    /// applied. Returns the total number of rows affected.
    fn bulk_update_from_slice_map_by_id(
        &self,
        table: &str,
        key: &str,
        rows: &[UnsavedRow],
    ) -> Result<u64> {
        let Some(first) = rows.first() else {
            return Err(Error::empty_batch(table, "update"));
        };

        let plan = UpdatePlan::new(table, key, first)?;
        let mut stmt = self.prepare(plan.sql())?;
        tracing::debug!(table, key, rows = rows.len(), "bulk update by key");

        let mut affected = 0u64;
        for row in rows {
            let args = plan.bind(row)?;
            let outcome = stmt.execute(&args).map_err(|e| match e {
                Error::Query(source) => Error::Query(source.context(format!(
                    "table[{}] {}[{}]",
                    table,
                    key,
                    codec::value_to_string(key, &row[key]).unwrap_or_default()
                ))),
                other => other,
            })?;
            affected += outcome.rows_affected.unwrap_or(0);
        }

        Ok(affected)
    }

    /// Every row as a map of generic values.
    fn query_value_rows(&self, sql: &str, args: &[Value]) -> Result<Vec<ValueMap>> {
        Ok(codec::rows_to_value_maps(self.query(sql, args)?))
    }

    /// First row as a map of generic values, `None` when the query returns nothing.
    fn query_value_row(&self, sql: &str, args: &[Value]) -> Result<Option<ValueMap>> {
        Ok(self.query_value_rows(sql, args)?.into_iter().next())
    }

    /// Every row as a map of canonical strings.
    fn query_string_rows(&self, sql: &str, args: &[Value]) -> Result<Vec<StringMap>> {
        codec::rows_to_string_maps(&self.query(sql, args)?)
    }

    /// First row as a map of canonical strings, `None` when the query returns nothing.
    fn query_string_row(&self, sql: &str, args: &[Value]) -> Result<Option<StringMap>> {
        let mut result = self.query(sql, args)?;
        if result.rows.is_empty() {
            return Ok(None);
        }
        let first = result.rows.swap_remove(0);
        codec::row_to_string_map(&result.columns, &first).map(Some)
    }

    /// One column of the first row; `None` when there is no row or no such column.
    fn query_field_value(&self, field: &str, sql: &str, args: &[Value]) -> Result<Option<Value>> {
        Ok(self
            .query_value_row(sql, args)?
            .and_then(|mut row| row.remove(field)))
    }

    /// One column from every row; rows lacking the column yield `Value::Null`.
    fn query_field_values(&self, field: &str, sql: &str, args: &[Value]) -> Result<Vec<Value>> {
        Ok(self
            .query_value_rows(sql, args)?
            .into_iter()
            .map(|mut row| row.remove(field).unwrap_or_default())
            .collect())
    }
}

/// A boxed driver trait object, as produced by registry factories.
pub type BoxedDriver = Box<dyn Driver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::mock::MockDriver;
    use crate::traits::{ColumnInfo, Row};

    fn row(pairs: &[(&str, Value)]) -> UnsavedRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn update_row(id: i64, name: &str) -> UnsavedRow {
        row(&[("id", Value::Int64(id)), ("name", Value::from(name))])
    }

    #[test]
    fn test_exec_outcome_merge() {
        let a = ExecOutcome::new(Some(1), Some(2));
        let b = ExecOutcome::new(Some(5), Some(3));
        assert_eq!(a.merge(b), ExecOutcome::new(Some(5), Some(5)));

        let none = ExecOutcome::unreported();
        assert_eq!(none.merge(none), ExecOutcome::unreported());
        assert_eq!(none.merge(b).rows_affected, Some(3));
    }

    #[test]
    fn test_default_ddl_statements() {
        let db = MockDriver::new();
        db.truncate("users").unwrap();
        db.drop_table("users").unwrap();
        db.copy_table("users", "users_copy").unwrap();

        let sql = db.executed_sql();
        assert_eq!(
            sql,
            vec![
                "TRUNCATE TABLE `users`",
                "DROP TABLE IF EXISTS `users`",
                "CREATE TABLE `users_copy` LIKE `users`",
            ]
        );
    }

    #[test]
    fn test_insert_helpers_execute_built_statements() {
        let db = MockDriver::new();
        db.insert_from_map(
            "t",
            &row(&[("name", Value::from("a")), ("value", Value::Int64(1))]),
        )
        .unwrap();

        let log = db.executed();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "INSERT INTO `t` (`name`, `value`) VALUES (?,?)");
        assert_eq!(log[0].1, vec![Value::from("a"), Value::Int64(1)]);
    }

    #[test]
    fn test_bulk_insert_is_a_single_statement() {
        let db = MockDriver::new();
        let rows: Vec<Vec<Value>> = (0..1000)
            .map(|i| vec![Value::Int64(i), Value::from("x"), Value::Null])
            .collect();

        db.bulk_insert_from_slice_slice("t", &["a", "b", "c"], &rows)
            .unwrap();

        let log = db.executed();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1.len(), 3000);
    }

    #[test]
    fn test_bulk_insert_in_batches() {
        let db = MockDriver::new();
        let rows: Vec<UnsavedRow> = (0..5).map(|i| update_row(i, "n")).collect();

        let outcome = db
            .bulk_insert_from_slice_map_in_batches("t", &rows, 2)
            .unwrap();

        let log = db.executed();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].1.len(), 4);
        assert_eq!(log[2].1.len(), 2);
        assert_eq!(outcome.rows_affected, Some(3));

        assert!(matches!(
            db.bulk_insert_from_slice_map_in_batches("t", &rows, 0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.bulk_insert_from_slice_map_in_batches("t", &[], 10),
            Err(Error::EmptyBatch { .. })
        ));
    }

    #[test]
    fn test_bulk_update_uses_one_prepared_statement() {
        let db = MockDriver::new();
        let rows = vec![update_row(1, "a"), update_row(2, "b"), update_row(3, "c")];

        let affected = db
            .bulk_update_from_slice_map_by_id("t", "id", &rows)
            .unwrap();

        assert_eq!(affected, 3);
        assert_eq!(db.prepare_count(), 1);
        let log = db.executed();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].0, "UPDATE `t` SET `name` = ? WHERE `id` = ?");
        assert_eq!(log[2].1, vec![Value::from("c"), Value::Int64(3)]);
        assert_eq!(db.open_statements(), 0);
    }

    #[test]
    fn test_bulk_update_halts_on_invalid_row() {
        let db = MockDriver::new();
        let rows = vec![
            update_row(1, "a"),
            update_row(2, "b"),
            row(&[("name", Value::from("c")), ("value", Value::Int64(3))]),
            update_row(4, "d"),
        ];

        let err = db
            .bulk_update_from_slice_map_by_id("t", "id", &rows)
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(db.executed().len(), 2);
        assert_eq!(db.open_statements(), 0);
    }

    #[test]
    fn test_bulk_update_returns_first_backend_error() {
        let db = MockDriver::new().fail_on(Value::Int64(2));
        let rows = vec![update_row(1, "a"), update_row(2, "b"), update_row(3, "c")];

        let err = db
            .bulk_update_from_slice_map_by_id("t", "id", &rows)
            .unwrap_err();

        assert!(matches!(err, Error::Query(_)));
        assert!(err.format_detailed().contains("table[t] id[2]"));
        assert_eq!(db.executed().len(), 1);
        assert_eq!(db.open_statements(), 0);
    }

    #[test]
    fn test_bulk_update_empty_batch() {
        let db = MockDriver::new();
        assert!(matches!(
            db.bulk_update_from_slice_map_by_id("t", "id", &[]),
            Err(Error::EmptyBatch { .. })
        ));
        assert_eq!(db.prepare_count(), 0);
    }

    #[test]
    fn test_update_from_map_by_id() {
        let db = MockDriver::new();
        db.update_from_map_by_id("t", "id", &update_row(7, "z"))
            .unwrap();

        let log = db.executed();
        assert_eq!(log[0].1, vec![Value::from("z"), Value::Int64(7)]);

        assert!(matches!(
            db.update_from_map_by_id("t", "id", &row(&[("id", Value::Int64(1))])),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_query_helpers() {
        let result = ResultSet::new(
            vec![
                ColumnInfo::new("id".to_string(), "INTEGER".to_string(), 0),
                ColumnInfo::new("name".to_string(), "TEXT".to_string(), 1),
            ],
            vec![
                Row::from_values(vec![Value::Int64(1), Value::from("a")]),
                Row::from_values(vec![Value::Int64(2), Value::Null]),
            ],
        );
        let db = MockDriver::new().with_result(result);

        let strings = db.query_string_rows("SELECT", &[]).unwrap();
        assert_eq!(strings[1]["name"], "");

        let first = db.query_string_row("SELECT", &[]).unwrap().unwrap();
        assert_eq!(first["id"], "1");

        let values = db.query_value_rows("SELECT", &[]).unwrap();
        assert_eq!(values[0]["id"], Value::Int64(1));

        assert_eq!(
            db.query_field_value("name", "SELECT", &[]).unwrap(),
            Some(Value::from("a"))
        );
        assert_eq!(db.query_field_value("missing", "SELECT", &[]).unwrap(), None);
        assert_eq!(
            db.query_field_values("id", "SELECT", &[]).unwrap(),
            vec![Value::Int64(1), Value::Int64(2)]
        );
    }

    #[test]
    fn test_query_row_helpers_on_empty_result() {
        let db = MockDriver::new();
        assert_eq!(db.query_value_row("SELECT", &[]).unwrap(), None);
        assert_eq!(db.query_string_row("SELECT", &[]).unwrap(), None);
        assert_eq!(db.query_field_value("id", "SELECT", &[]).unwrap(), None);
        assert!(db.query_field_values("id", "SELECT", &[]).unwrap().is_empty());
    }
}
