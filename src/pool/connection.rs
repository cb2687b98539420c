//! Database connection contract used by the pool.

use crate::error::PoolError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
    Connecting,
    Broken,
}

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Statement parameter or column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SqlValue {
    /// Read the value as text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Null => None,
        }
    }

    /// Read the value as a flag column.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(i) => Some(*i != 0),
            SqlValue::Text(s) => match s.as_str() {
                "1" | "true" | "True" | "TRUE" => Some(true),
                "0" | "false" | "False" | "FALSE" => Some(false),
                _ => None,
            },
            SqlValue::Null => None,
        }
    }
}

/// One result row.
pub type Row = Vec<SqlValue>;

/// A connection to the database that holds the sync table.
///
/// Statements use `?` placeholders bound from `params` in order.
pub trait DbConnection: Send {
    fn state(&self) -> ConnectionState;

    fn open(&mut self) -> Result<(), PoolError>;

    fn close(&mut self);

    fn begin_transaction(&mut self, isolation: IsolationLevel) -> Result<(), PoolError>;

    fn commit(&mut self) -> Result<(), PoolError>;

    fn rollback(&mut self) -> Result<(), PoolError>;

    /// Run a statement; returns the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, PoolError>;

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, PoolError>;
}

/// A pooled connection, shared between the pool and its users.
pub type SharedConnection = Arc<Mutex<Box<dyn DbConnection>>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_column_conversions() {
        assert_eq!(SqlValue::Int(1).as_bool(), Some(true));
        assert_eq!(SqlValue::Int(0).as_bool(), Some(false));
        assert_eq!(SqlValue::Text("true".into()).as_bool(), Some(true));
        assert_eq!(SqlValue::Text("maybe".into()).as_bool(), None);
        assert_eq!(SqlValue::Null.as_bool(), None);
    }

    #[test]
    fn test_text_column_conversions() {
        assert_eq!(SqlValue::Int(42).as_text().as_deref(), Some("42"));
        assert_eq!(SqlValue::Text("k".into()).as_text().as_deref(), Some("k"));
        assert_eq!(SqlValue::Null.as_text(), None);
    }
}
