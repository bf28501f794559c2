/// # Test Utilities Module
///
/// Shared fixtures for unit tests:
/// - `FakeProvider`: a scripted driver that records every call
/// - `sample_connection`: an in-memory SQLite database with a small `users` table

use crate::core::db::{ConnectionProvider, FetchShape, Row, StatementHandle, Value};
use crate::core::{DalError, Result};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// In-memory database with `users(id, name, active)`:
/// alice (active), bob (active), carol (inactive).
pub fn sample_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );
        INSERT INTO users (name, active) VALUES ('alice', 1);
        INSERT INTO users (name, active) VALUES ('bob', 1);
        INSERT INTO users (name, active) VALUES ('carol', 0);
    ",
    )
    .unwrap();
    conn
}

#[derive(Debug, Default)]
struct Script {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    affected: u64,
    last_insert_id: i64,
    fail_prefix: Option<String>,
}

/// Scripted stand-in for a SQL driver.
///
/// Every prepared statement returns the same scripted rows and affected
/// count. SQL starting with the `failing_on` prefix fails at prepare time;
/// transaction primitives are matched as `BEGIN`, `COMMIT` and `ROLLBACK`,
/// and a failed one leaves the open/closed flag untouched.
#[derive(Debug, Default)]
pub struct FakeProvider {
    script: Script,
    executed: RefCell<Vec<(String, Vec<Value>)>>,
    transaction_calls: RefCell<Vec<&'static str>>,
    sequences: RefCell<Vec<Option<String>>>,
    open: Cell<bool>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.script.columns = columns.iter().map(|c| c.to_string()).collect();
        self.script.rows = rows;
        self
    }

    pub fn with_affected(mut self, affected: u64) -> Self {
        self.script.affected = affected;
        self
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.script.last_insert_id = id;
        self
    }

    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.script.fail_prefix = Some(prefix.to_string());
        self
    }

    /// Executed statements with their bound parameters, in order.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.borrow().clone()
    }

    pub fn transaction_calls(&self) -> Vec<&'static str> {
        self.transaction_calls.borrow().clone()
    }

    /// Sequence names passed to `last_insert_id`.
    pub fn sequences(&self) -> Vec<Option<String>> {
        self.sequences.borrow().clone()
    }

    fn check(&self, sql: &str) -> Result<()> {
        match &self.script.fail_prefix {
            Some(prefix) if sql.starts_with(prefix.as_str()) => {
                Err(DalError::driver(format!("fake driver rejected: {sql}")))
            }
            _ => Ok(()),
        }
    }

    fn transaction(&self, sql: &'static str, call: &'static str, open: bool) -> Result<()> {
        self.check(sql)?;
        self.transaction_calls.borrow_mut().push(call);
        self.open.set(open);
        Ok(())
    }
}

pub struct FakeStatement<'c> {
    provider: &'c FakeProvider,
    sql: String,
    pending: VecDeque<Vec<Value>>,
    shape: FetchShape,
}

impl StatementHandle for FakeStatement<'_> {
    fn execute(&mut self, params: &[Value]) -> Result<bool> {
        self.provider
            .executed
            .borrow_mut()
            .push((self.sql.clone(), params.to_vec()));
        self.pending = self.provider.script.rows.iter().cloned().collect();
        Ok(true)
    }

    fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let columns = &self.provider.script.columns;
        let shape = self.shape;
        Ok(self
            .pending
            .drain(..)
            .map(|values| Row::shaped(columns, values, shape))
            .collect())
    }

    fn fetch_column(&mut self) -> Result<Option<Value>> {
        Ok(self.pending.pop_front().and_then(|v| v.into_iter().next()))
    }

    fn row_count(&self) -> u64 {
        self.provider.script.affected
    }

    fn set_fetch_mode(&mut self, shape: FetchShape) {
        self.shape = shape;
    }

    fn column_names(&self) -> Vec<String> {
        self.provider.script.columns.clone()
    }
}

impl ConnectionProvider for FakeProvider {
    type Statement<'c> = FakeStatement<'c>;

    fn prepare(&self, sql: &str) -> Result<FakeStatement<'_>> {
        self.check(sql)?;
        Ok(FakeStatement {
            provider: self,
            sql: sql.to_string(),
            pending: VecDeque::new(),
            shape: FetchShape::default(),
        })
    }

    fn begin_transaction(&self) -> Result<()> {
        self.transaction("BEGIN", "begin", true)
    }

    fn commit(&self) -> Result<()> {
        self.transaction("COMMIT", "commit", false)
    }

    fn rollback(&self) -> Result<()> {
        self.transaction("ROLLBACK", "rollback", false)
    }

    fn in_transaction(&self) -> bool {
        self.open.get()
    }

    fn last_insert_id(&self, sequence: Option<&str>) -> Result<i64> {
        self.sequences.borrow_mut().push(sequence.map(String::from));
        Ok(self.script.last_insert_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::Database;
    use crate::params;

    #[test]
    fn test_fake_rows_and_count() {
        let fake = FakeProvider::new().with_rows(&["n"], vec![params![5], params![6]]);
        let db = Database::new(&fake);

        assert_eq!(db.select("SELECT n FROM x", &[], None).unwrap().len(), 2);
        assert_eq!(db.count("SELECT n FROM x", &[]).unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_fake_failure_is_driver_error() {
        let fake = FakeProvider::new().failing_on("DELETE");
        let db = Database::new(&fake);
        let err = db.delete("DELETE FROM x", &[]).unwrap_err();
        assert_eq!(err.to_string(), "fake driver rejected: DELETE FROM x");
        assert!(fake.executed().is_empty());
    }
}
