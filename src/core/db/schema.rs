/// Schema Definition Module
///
/// This module renders and executes the two DDL statements the layer
/// supports: `CREATE TABLE IF NOT EXISTS` from ordered field descriptors,
/// and `ALTER TABLE .. ADD INDEX`. Output targets the MySQL dialect.

use crate::core::db::connection::ConnectionProvider;
use crate::core::db::query;
use crate::core::{DalError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

/// Options clause appended when the caller supplies none.
pub const DEFAULT_TABLE_OPTIONS: &str = " CHARACTER SET utf8 COLLATE utf8_general_ci";

static PRIMARY_KEY_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*PRIMARY KEY").expect("primary key pattern is valid"));

/// Renders a `CREATE TABLE IF NOT EXISTS` statement.
///
/// Each descriptor is a `(field, type clause)` pair, emitted in order. A
/// clause containing `PRIMARY KEY` (any case) has the token removed and the
/// field is declared as a table-level `PRIMARY KEY (<field>)` instead.
///
/// When several descriptors carry the token, only the last one becomes the
/// primary key; the others silently lose it. Existing callers depend on
/// this output, so it is kept as is.
///
/// `options` is appended verbatim after the closing parenthesis, or
/// [`DEFAULT_TABLE_OPTIONS`] when `None`.
///
/// # Errors
///
/// Returns `DalError::Schema` when `fields` is empty.
pub fn create_table_sql<F, T>(
    name: &str,
    fields: &[(F, T)],
    options: Option<&str>,
) -> Result<String>
where
    F: AsRef<str>,
    T: AsRef<str>,
{
    if fields.is_empty() {
        return Err(DalError::Schema(format!(
            "table {name} needs at least one field descriptor"
        )));
    }

    let mut primary_key = None;
    let mut columns = Vec::with_capacity(fields.len());
    for (field, clause) in fields {
        let (field, clause) = (field.as_ref(), clause.as_ref());
        if PRIMARY_KEY_TOKEN.is_match(clause) {
            primary_key = Some(field);
            let stripped = PRIMARY_KEY_TOKEN.replace_all(clause, "");
            let stripped = stripped.trim();
            if stripped.is_empty() {
                columns.push(field.to_string());
            } else {
                columns.push(format!("{field} {stripped}"));
            }
        } else {
            columns.push(format!("{field} {clause}"));
        }
    }

    let mut sql = format!("CREATE TABLE IF NOT EXISTS {name} ({}", columns.join(", "));
    if let Some(pk) = primary_key {
        sql.push_str(&format!(", PRIMARY KEY ({pk})"));
    }
    sql.push(')');
    sql.push_str(options.unwrap_or(DEFAULT_TABLE_OPTIONS));
    Ok(sql)
}

/// Renders `ALTER TABLE <table> ADD INDEX <name>(<column>)`.
pub fn add_index_sql(table: &str, column: &str, name: &str) -> String {
    format!("ALTER TABLE {table} ADD INDEX {name}({column})")
}

/// Executes generated DDL on a borrowed connection.
pub struct SchemaBuilder<'c, P> {
    conn: &'c P,
    default_options: &'c str,
}

impl<'c, P: ConnectionProvider> SchemaBuilder<'c, P> {
    pub fn new(conn: &'c P) -> Self {
        Self::with_default_options(conn, DEFAULT_TABLE_OPTIONS)
    }

    /// Uses `options` whenever `create_table` is called without its own.
    pub fn with_default_options(conn: &'c P, options: &'c str) -> Self {
        SchemaBuilder {
            conn,
            default_options: options,
        }
    }

    /// Creates a table unless it already exists.
    ///
    /// Returns the driver's success flag; see [`create_table_sql`] for how
    /// the statement is built.
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
        let sql = create_table_sql(name, fields, Some(options.unwrap_or(self.default_options)))?;
        let created = query::run(self.conn, &sql, &[])?;
        info!(table = name, "create table executed");
        Ok(created)
    }

    /// Adds a named index on one column.
    pub fn add_index(&self, table: &str, column: &str, name: &str) -> Result<bool> {
        query::run(self.conn, &add_index_sql(table, column, name), &[])
    }
}
