//! Recording driver for handle-level tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::connection::{Driver, ExecOutcome, PreparedStatement};
use super::row::{ResultSet, Value};
use crate::error::{Error, Result};

type Log = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

/// Records every successful statement; fails any statement whose arguments
/// contain the configured value.
#[derive(Default)]
pub struct MockDriver {
    log: Log,
    fail_on: Option<Value>,
    result: ResultSet,
    prepared: AtomicUsize,
    open_statements: Arc<AtomicUsize>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, value: Value) -> Self {
        self.fail_on = Some(value);
        self
    }

    pub fn with_result(mut self, result: ResultSet) -> Self {
        self.result = result;
        self
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|(sql, _)| sql).collect()
    }

    pub fn prepare_count(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    /// Prepared statements created and not yet dropped
    pub fn open_statements(&self) -> usize {
        self.open_statements.load(Ordering::SeqCst)
    }
}

fn record(log: &Log, fail_on: &Option<Value>, sql: &str, args: &[Value]) -> Result<ExecOutcome> {
    if let Some(bad) = fail_on.as_ref().filter(|bad| args.contains(bad)) {
        return Err(Error::query(anyhow::anyhow!("mock failure on {:?}", bad)));
    }
    let mut log = log.lock().unwrap();
    log.push((sql.to_string(), args.to_vec()));
    Ok(ExecOutcome::new(Some(log.len() as i64), Some(1)))
}

impl Driver for MockDriver {
    fn driver_name(&self) -> &str {
        "mock"
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecOutcome> {
        record(&self.log, &self.fail_on, sql, args)
    }

    fn query(&self, _sql: &str, _args: &[Value]) -> Result<ResultSet> {
        Ok(self.result.clone())
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        self.open_statements.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStatement {
            sql: sql.to_string(),
            log: self.log.clone(),
            fail_on: self.fail_on.clone(),
            open: self.open_statements.clone(),
        }))
    }

    fn get_table_columns(&self, _table: &str) -> Result<Vec<String>> {
        Ok(self.result.columns.iter().map(|c| c.name.clone()).collect())
    }
}

struct MockStatement {
    sql: String,
    log: Log,
    fail_on: Option<Value>,
    open: Arc<AtomicUsize>,
}

impl PreparedStatement for MockStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute(&mut self, args: &[Value]) -> Result<ExecOutcome> {
        record(&self.log, &self.fail_on, &self.sql, args)
    }
}

impl Drop for MockStatement {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
