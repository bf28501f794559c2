/// Query Execution Module
///
/// This module provides the value model shared by every driver (scalars,
/// rows and fetch shapes) and the statement executor that prepares,
/// binds and runs a single statement.

use crate::core::db::connection::{ConnectionProvider, StatementHandle};
use crate::core::Result;
use rusqlite::types::{ToSqlOutput, ValueRef};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// A scalar value bound to a placeholder or read back from a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Returns the value as an integer when it holds one, or text that parses as one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Text(t) => t.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the text content, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(t) => write!(f, "{t}"),
            Value::Blob(b) => write!(f, "<BLOB: {} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// TEXT that is not valid UTF-8 comes back as `Blob` with its bytes untouched.
impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(t) => ValueRef::Text(t.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

/// Builds an owned parameter list from heterogeneous scalars.
///
/// ```
/// use crudlayer::params;
/// let p = params![1, "alice", None::<i64>];
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::core::db::Value>::new()
    };
    ($($v:expr),+ $(,)?) => {
        ::std::vec![$($crate::core::db::Value::from($v)),+]
    };
}

/// Row format applied when a result set is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchShape {
    /// Column name to value
    #[default]
    Assoc,
    /// Column position to value
    Num,
    /// Both keys for every column, name first
    Both,
}

/// Key of a single row entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKey {
    Name(String),
    Index(usize),
}

/// One materialized result row, entries in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    entries: Vec<(ColumnKey, Value)>,
}

impl Row {
    /// Shapes raw column values into a row.
    ///
    /// Under `Assoc`, a repeated column name keeps only the last value, in
    /// the position of its first occurrence.
    pub fn shaped(columns: &[String], values: Vec<Value>, shape: FetchShape) -> Self {
        let mut entries: Vec<(ColumnKey, Value)> = Vec::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            let name = columns.get(i).cloned().unwrap_or_else(|| i.to_string());
            match shape {
                FetchShape::Assoc => {
                    let key = ColumnKey::Name(name);
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                FetchShape::Num => entries.push((ColumnKey::Index(i), value)),
                FetchShape::Both => {
                    entries.push((ColumnKey::Name(name), value.clone()));
                    entries.push((ColumnKey::Index(i), value));
                }
            }
        }
        Row { entries }
    }

    /// Looks a value up by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find_map(|(k, v)| match k {
            ColumnKey::Name(n) if n == name => Some(v),
            _ => None,
        })
    }

    /// Looks a value up by column position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.entries.iter().find_map(|(k, v)| match k {
            ColumnKey::Index(i) if *i == index => Some(v),
            _ => None,
        })
    }

    /// Value of the n-th column regardless of how the row is keyed.
    pub fn column(&self, index: usize) -> Option<&Value> {
        self.get_index(index).or_else(|| {
            self.entries
                .iter()
                .filter(|(k, _)| matches!(k, ColumnKey::Name(_)))
                .nth(index)
                .map(|(_, v)| v)
        })
    }

    pub fn entries(&self) -> &[(ColumnKey, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let positional = self
            .entries
            .iter()
            .all(|(k, _)| matches!(k, ColumnKey::Index(_)));
        if positional {
            let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
            for (_, v) in &self.entries {
                seq.serialize_element(v)?;
            }
            seq.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.entries.len()))?;
            for (k, v) in &self.entries {
                match k {
                    ColumnKey::Name(n) => map.serialize_entry(n, v)?,
                    ColumnKey::Index(i) => map.serialize_entry(&i.to_string(), v)?,
                }
            }
            map.end()
        }
    }
}

/// Prepares `sql`, binds `params` in order and executes it.
///
/// # Errors
///
/// Returns `DalError::ParameterMismatch` when the driver rejects the
/// parameter list and `DalError::Driver` for any other backend failure.
pub fn execute<'c, P>(conn: &'c P, sql: &str, params: &[Value]) -> Result<P::Statement<'c>>
where
    P: ConnectionProvider,
{
    debug!(sql, params = params.len(), "executing statement");
    let mut stmt = conn.prepare(sql)?;
    stmt.execute(params)?;
    Ok(stmt)
}

/// Like [`execute`], but returns the driver's success flag instead of the statement.
pub fn run<P: ConnectionProvider>(conn: &P, sql: &str, params: &[Value]) -> Result<bool> {
    debug!(sql, params = params.len(), "running statement");
    let mut stmt = conn.prepare(sql)?;
    stmt.execute(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DalError;
    use crate::test_utils::{sample_connection, FakeProvider};

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assoc_shape() {
        let row = Row::shaped(&columns(&["id", "name"]), params![1, "Alice"], FetchShape::Assoc);
        assert_eq!(row.get("name"), Some(&Value::from("Alice")));
        assert_eq!(row.get_index(0), None);
        assert_eq!(row.column(0), Some(&Value::Integer(1)));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_num_shape() {
        let row = Row::shaped(&columns(&["id", "name"]), params![1, "Alice"], FetchShape::Num);
        assert_eq!(row.get("id"), None);
        assert_eq!(row.get_index(1), Some(&Value::from("Alice")));
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[1,"Alice"]"#);
    }

    #[test]
    fn test_both_shape() {
        let row = Row::shaped(&columns(&["id"]), params![7], FetchShape::Both);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("id"), row.get_index(0));
    }

    #[test]
    fn test_assoc_duplicate_column_keeps_last() {
        let row = Row::shaped(&columns(&["v", "v"]), params![1, 2], FetchShape::Assoc);
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("v"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_row_serializes_as_object() {
        let row = Row::shaped(
            &columns(&["id", "note"]),
            vec![Value::Integer(3), Value::Null],
            FetchShape::Assoc,
        );
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"id":3,"note":null}"#);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::Text(" 42 ".into()).as_i64(), Some(42));
        assert_eq!(Value::Real(1.5).as_i64(), None);
        assert_eq!(Value::Blob(vec![1, 2, 3]).to_string(), "<BLOB: 3 bytes>");
    }

    #[test]
    fn test_invalid_utf8_text_keeps_bytes() {
        assert_eq!(Value::from(ValueRef::Text(b"caf\xc3\xa9")), Value::from("caf\u{e9}"));
        assert_eq!(Value::from(ValueRef::Text(b"caf\xe9")), Value::Blob(b"caf\xe9".to_vec()));
    }

    #[test]
    fn test_invalid_utf8_read_back_from_sqlite() {
        let conn = sample_connection();
        let mut stmt = execute(&conn, "SELECT CAST(X'FFFE41' AS TEXT) AS raw", &[]).unwrap();
        assert_eq!(stmt.fetch_column().unwrap(), Some(Value::Blob(vec![0xff, 0xfe, 0x41])));
    }

    #[test]
    fn test_execute_binds_in_order() {
        let fake = FakeProvider::new().with_affected(1);
        execute(&fake, "UPDATE t SET a = ? WHERE b = ?", &params!["x", 2]).unwrap();

        let executed = fake.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].0, "UPDATE t SET a = ? WHERE b = ?");
        assert_eq!(executed[0].1, params!["x", 2]);
    }

    #[test]
    fn test_execute_on_sqlite() {
        let conn = sample_connection();
        let mut stmt = execute(&conn, "SELECT name FROM users WHERE id = ?", &params![2]).unwrap();
        let rows = stmt.fetch_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("bob")));
    }

    #[test]
    fn test_execute_rejects_bad_sql() {
        let conn = sample_connection();
        let err = execute(&conn, "SELEKT 1", &[]).unwrap_err();
        match err {
            DalError::Driver(e) => assert!(e.to_string().contains("syntax error")),
            other => panic!("Expected Driver error, got {other:?}"),
        }
    }
}
