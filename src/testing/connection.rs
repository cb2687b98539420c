//! An in-memory stand-in for a database holding the sync table.

use crate::error::PoolError;
use crate::pool::connection::{ConnectionState, DbConnection, IsolationLevel, Row, SqlValue};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SyncRow {
    cache_id: String,
    cache_key: String,
    modified: bool,
    work_in_progress: bool,
}

#[derive(Debug)]
struct ScriptState {
    state: ConnectionState,
    rows: Vec<SyncRow>,
    /// Rows as they were when the open transaction began.
    saved: Option<Vec<SyncRow>>,
    statements: Vec<String>,
    fail_prefix: Option<String>,
    fail_open: bool,
    opens: usize,
    commits: usize,
    rollbacks: usize,
}

/// Connection over a single sync table kept in memory.
///
/// Understands the `UPDATE`, `SELECT` and `DELETE` statements the pool
/// issues, dispatching on the leading keyword and binding the cache id from
/// the first parameter. Clones share state, so a test can keep a probe
/// after handing the connection to the pool.
#[derive(Debug, Clone)]
pub struct ScriptedConnection {
    inner: Arc<Mutex<ScriptState>>,
}

impl Default for ScriptedConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptState {
                state: ConnectionState::Closed,
                rows: Vec::new(),
                saved: None,
                statements: Vec::new(),
                fail_prefix: None,
                fail_open: false,
                opens: 0,
                commits: 0,
                rollbacks: 0,
            })),
        }
    }

    /// Seed a sync row.
    pub fn with_row(self, cache_id: &str, cache_key: &str, modified: bool) -> Self {
        self.inner.lock().rows.push(SyncRow {
            cache_id: cache_id.to_string(),
            cache_key: cache_key.to_string(),
            modified,
            work_in_progress: false,
        });
        self
    }

    /// Fail every statement starting with `prefix`.
    pub fn fail_on(&self, prefix: &str) {
        self.inner.lock().fail_prefix = Some(prefix.to_string());
    }

    pub fn fail_open(&self, fail: bool) {
        self.inner.lock().fail_open = fail;
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.inner.lock().state = state;
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().opens
    }

    pub fn committed(&self) -> usize {
        self.inner.lock().commits
    }

    pub fn rolled_back(&self) -> usize {
        self.inner.lock().rollbacks
    }

    /// Statements executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.inner.lock().statements.clone()
    }

    /// Keys of the rows still in the table.
    pub fn row_keys(&self) -> Vec<String> {
        self.inner
            .lock()
            .rows
            .iter()
            .map(|r| r.cache_key.clone())
            .collect()
    }

    pub fn row_in_progress(&self, cache_key: &str) -> bool {
        self.inner
            .lock()
            .rows
            .iter()
            .any(|r| r.cache_key == cache_key && r.work_in_progress)
    }
}

impl ScriptState {
    fn check(&mut self, sql: &str) -> Result<String, PoolError> {
        if self.state != ConnectionState::Open {
            return Err(PoolError::NotOpen);
        }
        self.statements.push(sql.to_string());
        if let Some(prefix) = &self.fail_prefix {
            if sql.starts_with(prefix.as_str()) {
                return Err(PoolError::StatementFailed(format!("scripted failure: {sql}")));
            }
        }
        Ok(sql.split_whitespace().next().unwrap_or_default().to_uppercase())
    }
}

fn bound_cache_id(params: &[SqlValue]) -> Result<String, PoolError> {
    params
        .first()
        .and_then(SqlValue::as_text)
        .ok_or_else(|| PoolError::StatementFailed("missing cache id parameter".into()))
}

impl DbConnection for ScriptedConnection {
    fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    fn open(&mut self) -> Result<(), PoolError> {
        let mut s = self.inner.lock();
        if s.fail_open {
            s.state = ConnectionState::Broken;
            return Err(PoolError::OpenFailed("scripted open failure".into()));
        }
        s.opens += 1;
        s.state = ConnectionState::Open;
        Ok(())
    }

    fn close(&mut self) {
        let mut s = self.inner.lock();
        s.state = ConnectionState::Closed;
        s.saved = None;
    }

    fn begin_transaction(&mut self, _isolation: IsolationLevel) -> Result<(), PoolError> {
        let mut s = self.inner.lock();
        if s.state != ConnectionState::Open {
            return Err(PoolError::NotOpen);
        }
        if s.saved.is_some() {
            return Err(PoolError::TransactionFailed("transaction already open".into()));
        }
        s.saved = Some(s.rows.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PoolError> {
        let mut s = self.inner.lock();
        match s.saved.take() {
            Some(_) => {
                s.commits += 1;
                Ok(())
            }
            None => Err(PoolError::TransactionFailed("no open transaction".into())),
        }
    }

    fn rollback(&mut self) -> Result<(), PoolError> {
        let mut s = self.inner.lock();
        match s.saved.take() {
            Some(rows) => {
                s.rows = rows;
                s.rollbacks += 1;
                Ok(())
            }
            None => Err(PoolError::TransactionFailed("no open transaction".into())),
        }
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, PoolError> {
        let mut s = self.inner.lock();
        let verb = s.check(sql)?;
        let cache_id = bound_cache_id(params)?;

        match verb.as_str() {
            "UPDATE" => {
                let mut affected = 0;
                for row in s.rows.iter_mut() {
                    if row.cache_id == cache_id && row.modified {
                        row.work_in_progress = true;
                        affected += 1;
                    }
                }
                Ok(affected)
            }
            "DELETE" => {
                let before = s.rows.len();
                s.rows
                    .retain(|row| !(row.cache_id == cache_id && row.work_in_progress));
                Ok((before - s.rows.len()) as u64)
            }
            other => Err(PoolError::StatementFailed(format!(
                "unsupported statement {other}"
            ))),
        }
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, PoolError> {
        let mut s = self.inner.lock();
        let verb = s.check(sql)?;
        if verb != "SELECT" {
            return Err(PoolError::StatementFailed(format!("unsupported query {verb}")));
        }
        let cache_id = bound_cache_id(params)?;

        Ok(s.rows
            .iter()
            .filter(|row| row.cache_id == cache_id && row.work_in_progress)
            .map(|row| {
                vec![
                    SqlValue::Text(row.cache_key.clone()),
                    SqlValue::Bool(row.modified),
                ]
            })
            .collect())
    }
}
