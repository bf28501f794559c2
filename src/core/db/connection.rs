/// Connection Management Module
///
/// This module defines the capabilities the data-access layer consumes from
/// a SQL backend and implements them for `rusqlite::Connection`.
///
/// Connections are never owned or cached here: callers open them (see
/// [`connect`]) and hand the layer a reference for the lifetime of a
/// logical session.

use crate::config::DatabaseConfig;
use crate::core::db::query::{FetchShape, Row, Value};
use crate::core::{DalError, Result};
use rusqlite::Connection;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// Statement preparation and transaction primitives of a SQL backend.
pub trait ConnectionProvider {
    /// Prepared statement borrowing the connection.
    type Statement<'c>: StatementHandle
    where
        Self: 'c;

    /// Parses `sql` into a statement with positional placeholders.
    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>>;

    fn begin_transaction(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Whether the backend currently has a transaction open.
    ///
    /// Backends may end a transaction on their own (e.g. a conflict
    /// resolved with `ROLLBACK`), so this can disagree with what the
    /// caller last requested.
    fn in_transaction(&self) -> bool;

    /// Identifier generated for the most recently inserted row.
    ///
    /// `sequence` names the sequence or generator on backends that need one.
    fn last_insert_id(&self, sequence: Option<&str>) -> Result<i64>;
}

/// A prepared statement: bind and execute, then consume results.
pub trait StatementHandle {
    /// Binds `params` in declaration order and runs the statement.
    fn execute(&mut self, params: &[Value]) -> Result<bool>;

    /// Materializes every remaining row using the current fetch shape.
    fn fetch_all(&mut self) -> Result<Vec<Row>>;

    /// First column of the next row, or `None` once rows are exhausted.
    fn fetch_column(&mut self) -> Result<Option<Value>>;

    /// Rows affected by the last execution of a mutating statement.
    fn row_count(&self) -> u64;

    fn set_fetch_mode(&mut self, shape: FetchShape);

    fn column_names(&self) -> Vec<String>;
}

/// Statement prepared on a SQLite connection.
///
/// Result sets are buffered during `execute` so that the statement can be
/// consumed freely afterwards.
#[derive(Debug)]
pub struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
    columns: Vec<String>,
    pending: VecDeque<Vec<Value>>,
    affected: u64,
    shape: FetchShape,
}

impl<'c> SqliteStatement<'c> {
    fn new(stmt: rusqlite::Statement<'c>) -> Self {
        let columns = stmt.column_names().into_iter().map(String::from).collect();
        SqliteStatement {
            stmt,
            columns,
            pending: VecDeque::new(),
            affected: 0,
            shape: FetchShape::default(),
        }
    }

    /// Number of positional placeholders in the statement.
    pub fn parameter_count(&self) -> usize {
        self.stmt.parameter_count()
    }
}

impl StatementHandle for SqliteStatement<'_> {
    fn execute(&mut self, params: &[Value]) -> Result<bool> {
        let expected = self.stmt.parameter_count();
        if expected != params.len() {
            return Err(DalError::ParameterMismatch {
                expected,
                actual: params.len(),
            });
        }
        for (i, param) in params.iter().enumerate() {
            self.stmt.raw_bind_parameter(i + 1, param)?;
        }

        self.pending.clear();
        if self.columns.is_empty() {
            self.affected = self.stmt.raw_execute()? as u64;
        } else {
            let width = self.columns.len();
            let mut rows = self.stmt.raw_query();
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(Value::from(row.get_ref(i)?));
                }
                self.pending.push_back(values);
            }
            self.affected = 0;
        }
        Ok(true)
    }

    fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let shape = self.shape;
        Ok(self
            .pending
            .drain(..)
            .map(|values| Row::shaped(&self.columns, values, shape))
            .collect())
    }

    fn fetch_column(&mut self) -> Result<Option<Value>> {
        Ok(self
            .pending
            .pop_front()
            .and_then(|values| values.into_iter().next()))
    }

    fn row_count(&self) -> u64 {
        self.affected
    }

    fn set_fetch_mode(&mut self, shape: FetchShape) {
        self.shape = shape;
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }
}

impl ConnectionProvider for Connection {
    type Statement<'c> = SqliteStatement<'c>;

    fn prepare(&self, sql: &str) -> Result<SqliteStatement<'_>> {
        let stmt = Connection::prepare(self, sql)?;
        Ok(SqliteStatement::new(stmt))
    }

    fn begin_transaction(&self) -> Result<()> {
        self.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.is_autocommit()
    }

    fn last_insert_id(&self, sequence: Option<&str>) -> Result<i64> {
        if let Some(sequence) = sequence {
            debug!(sequence, "sqlite ignores sequence names for last insert id");
        }
        Ok(self.last_insert_rowid())
    }
}

/// Opens a SQLite connection and applies the configured pragmas.
///
/// # Arguments
///
/// * `config` - Database section of the configuration; `path` may be `:memory:`
///
/// # Errors
///
/// Returns `DalError::Driver` if the file cannot be opened or a pragma is rejected.
pub fn connect(config: &DatabaseConfig) -> Result<Connection> {
    let conn = if config.path == ":memory:" {
        Connection::open_in_memory()?
    } else {
        Connection::open(&config.path)?
    };

    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    if let Some(mode) = &config.journal_mode {
        let applied: String =
            conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
        debug!(requested = %mode, applied = %applied, "journal mode set");
    }

    info!(path = %config.path, "opened database connection");
    Ok(conn)
}
