/// CRUD Facade Module
///
/// `Database` is the caller-facing entry point. It borrows one connection
/// for its whole lifetime and routes every call through the statement
/// executor; transaction state and schema helpers share that connection.
///
/// Driver failures surface unchanged. A failing statement inside a
/// transaction does not roll it back: that is the caller's decision.

use crate::core::db::connection::{ConnectionProvider, StatementHandle};
use crate::core::db::query::{self, FetchShape, Row, Value};
use crate::core::db::schema::{SchemaBuilder, DEFAULT_TABLE_OPTIONS};
use crate::core::db::transaction::{TransactionController, TransactionState};
use crate::core::{DalError, Result};

/// Parameterized CRUD, transactions and DDL over an injected connection.
///
/// Intended for single-threaded, per-session use.
///
/// # Examples
///
/// ```
/// use crudlayer::core::db::Database;
/// use crudlayer::params;
///
/// let conn = rusqlite::Connection::open_in_memory().unwrap();
/// let mut db = Database::with_table_options(&conn, "");
/// db.create_table("notes", &[("id", "INTEGER PRIMARY KEY"), ("body", "TEXT")], None).unwrap();
///
/// db.begin().unwrap();
/// db.insert("INSERT INTO notes (body) VALUES (?)", &params!["hello"]).unwrap();
/// db.commit().unwrap();
///
/// let rows = db.select("SELECT body FROM notes", &[], None).unwrap();
/// assert_eq!(rows.len(), 1);
/// ```
pub struct Database<'c, P: ConnectionProvider> {
    conn: &'c P,
    transaction: TransactionController<'c, P>,
    table_options: String,
}

impl<'c, P: ConnectionProvider> Database<'c, P> {
    /// Creates a facade using the default table options for DDL.
    pub fn new(conn: &'c P) -> Self {
        Self::with_table_options(conn, DEFAULT_TABLE_OPTIONS)
    }

    /// Creates a facade whose `create_table` falls back to `options`.
    pub fn with_table_options(conn: &'c P, options: impl Into<String>) -> Self {
        Database {
            conn,
            transaction: TransactionController::new(conn),
            table_options: options.into(),
        }
    }

    /// The injected connection.
    pub fn connection(&self) -> &'c P {
        self.conn
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.transaction.state()
    }

    pub fn begin(&mut self) -> Result<()> {
        self.transaction.begin()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.transaction.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.transaction.rollback()
    }

    /// Executes `sql` and hands back the statement for caller-driven consumption.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<P::Statement<'c>> {
        query::execute(self.conn, sql, params)
    }

    /// Executes a query and materializes every row.
    ///
    /// # Arguments
    ///
    /// * `sql` - Query with positional placeholders
    /// * `params` - Values bound in placeholder order
    /// * `shape` - Row format; `None` keeps the statement default (`FetchShape::Assoc`)
    pub fn select(
        &self,
        sql: &str,
        params: &[Value],
        shape: Option<FetchShape>,
    ) -> Result<Vec<Row>> {
        let mut stmt = query::execute(self.conn, sql, params)?;
        if let Some(shape) = shape {
            stmt.set_fetch_mode(shape);
        }
        stmt.fetch_all()
    }

    /// Executes an INSERT and returns the affected-row count.
    pub fn insert(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.affected(sql, params)
    }

    /// Executes an UPDATE and returns the affected-row count.
    pub fn update(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.affected(sql, params)
    }

    /// Executes a DELETE and returns the affected-row count.
    pub fn delete(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.affected(sql, params)
    }

    /// Identifier the driver assigned to the most recently inserted row.
    pub fn last_insert_id(&self, sequence: Option<&str>) -> Result<i64> {
        self.conn.last_insert_id(sequence)
    }

    /// Returns column 0 of the first row.
    ///
    /// # Errors
    ///
    /// Returns `DalError::EmptyResult` when the query yields no rows.
    pub fn count(&self, sql: &str, params: &[Value]) -> Result<Value> {
        let mut stmt = query::execute(self.conn, sql, params)?;
        stmt.fetch_column()?.ok_or(DalError::EmptyResult)
    }

    /// Schema builder over the same connection and default table options.
    pub fn schema(&self) -> SchemaBuilder<'_, P> {
        SchemaBuilder::with_default_options(self.conn, &self.table_options)
    }

    /// See [`SchemaBuilder::create_table`].
    pub fn create_table<F, T>(
        &self,
        name: &str,
        fields: &[(F, T)],
        options: Option<&str>,
    ) -> Result<bool>
    where
        F: AsRef<str>,
        T: AsRef<str>,
    {
        self.schema().create_table(name, fields, options)
    }

    /// See [`SchemaBuilder::add_index`].
    pub fn add_index(&self, table: &str, column: &str, name: &str) -> Result<bool> {
        self.schema().add_index(table, column, name)
    }

    fn affected(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let stmt = query::execute(self.conn, sql, params)?;
        Ok(stmt.row_count())
    }
}
