//! Shared database connections and their sync-table snapshots.

use super::connection::{ConnectionState, DbConnection, IsolationLevel, SharedConnection, SqlValue};
use super::resource_pool::ResourcePool;
use crate::config::DbSyncConfig;
use crate::error::{PoolError, Result};
use crate::metrics::CoordinationMetrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Keys found modified in the sync table, with their `MODIFIED` flag.
pub type SyncSnapshot = HashMap<String, bool>;

/// A pooled connection and its latest sync snapshot.
struct DbResourceInfo {
    connection: SharedConnection,
    sync_data: Option<SyncSnapshot>,
}

impl DbResourceInfo {
    fn close(self) {
        self.connection.lock().close();
    }
}

/// Pool of database connections keyed by connection string.
///
/// Connection strings are matched case-insensitively. Each `pool_connection`
/// call takes a reference that a later `remove_connection` gives back; the
/// connection is closed when the last reference goes.
///
/// Every operation runs under one pool-wide lock.
pub struct DbConnectionPool {
    inner: Mutex<ResourcePool<DbResourceInfo>>,
    metrics: Arc<CoordinationMetrics>,
}

impl DbConnectionPool {
    pub fn new(metrics: Arc<CoordinationMetrics>) -> Self {
        Self {
            inner: Mutex::new(ResourcePool::new()),
            metrics,
        }
    }

    /// Take a reference to the connection for `conn_string`.
    ///
    /// If the string is already pooled the pooled connection is returned,
    /// reopened first when closed or broken, and `new_connection` is dropped.
    /// Otherwise `new_connection` is opened and adopted.
    pub fn pool_connection(
        &self,
        conn_string: &str,
        mut new_connection: Box<dyn DbConnection>,
    ) -> Result<SharedConnection> {
        let key = pool_key(conn_string);
        let mut pool = self.inner.lock();

        if let Some(info) = pool.get_resource(&key) {
            let connection = info.connection.clone();
            {
                let mut conn = connection.lock();
                if matches!(conn.state(), ConnectionState::Closed | ConnectionState::Broken) {
                    debug!(state = ?conn.state(), "Reopening pooled connection");
                    conn.open()?;
                }
            }
            pool.add_resource(&key, None);
            return Ok(connection);
        }

        new_connection.open()?;
        let connection: SharedConnection = Arc::new(Mutex::new(new_connection));
        pool.add_resource(
            &key,
            Some(DbResourceInfo {
                connection: connection.clone(),
                sync_data: None,
            }),
        );
        self.metrics.connections_pooled.inc();
        info!(pooled = pool.len(), "Database connection pooled");
        Ok(connection)
    }

    /// Give back one reference; the last one closes the connection.
    pub fn remove_connection(&self, conn_string: &str) {
        let key = pool_key(conn_string);
        let released = self.inner.lock().remove_resource(&key);
        if let Some(info) = released {
            self.evicted(info);
        }
    }

    /// Close and evict a connection that can no longer be used, whatever its
    /// reference count.
    pub fn remove_severed_connection(&self, conn_string: &str) {
        let key = pool_key(conn_string);
        let severed = self.inner.lock().remove_severed_resource(&key);
        if let Some(info) = severed {
            warn!("Severed database connection evicted");
            self.evicted(info);
        }
    }

    fn evicted(&self, info: DbResourceInfo) {
        info.close();
        self.metrics.connections_pooled.dec();
        self.metrics.connections_evicted.inc();
    }

    pub fn get_connection(&self, conn_string: &str) -> Option<SharedConnection> {
        self.inner
            .lock()
            .get_resource(&pool_key(conn_string))
            .map(|info| info.connection.clone())
    }

    /// Copy of the latest snapshot taken on `conn_string`.
    pub fn get_resource_sync_info(&self, conn_string: &str) -> Option<SyncSnapshot> {
        self.inner
            .lock()
            .get_resource(&pool_key(conn_string))
            .and_then(|info| info.sync_data.clone())
    }

    /// Mark the modified rows of `cache_id` as in progress and snapshot them,
    /// on every pooled connection.
    ///
    /// A connection that fails is rolled back and keeps no snapshot; the
    /// others are unaffected.
    pub fn acquire_sync_data(&self, sync_table: &str, cache_id: &str) -> Result<()> {
        DbSyncConfig::new(sync_table, cache_id).validate()?;

        let mut pool = self.inner.lock();
        for (key, info) in pool.resources_mut() {
            info.sync_data = match load_table_data(&info.connection, sync_table, cache_id) {
                Ok(snapshot) => {
                    debug!(keys = snapshot.len(), "Sync snapshot acquired");
                    Some(snapshot)
                }
                Err(e) => {
                    error!(
                        context = "DbConnectionPool::acquire_sync_data",
                        connection = %key,
                        error = %e,
                        "Failed to load sync table data"
                    );
                    self.metrics.sync_snapshot_failures.inc();
                    None
                }
            };
        }
        Ok(())
    }

    /// Delete the in-progress rows of `cache_id` on every pooled connection
    /// and clear the snapshots.
    pub fn remove_sync_data(&self, sync_table: &str, cache_id: &str) -> Result<()> {
        DbSyncConfig::new(sync_table, cache_id).validate()?;

        let mut pool = self.inner.lock();
        for (key, info) in pool.resources_mut() {
            if let Err(e) = remove_table_data(&info.connection, sync_table, cache_id) {
                error!(
                    context = "DbConnectionPool::remove_sync_data",
                    connection = %key,
                    error = %e,
                    "Failed to remove sync table data"
                );
            }
            info.sync_data = None;
        }
        Ok(())
    }

    /// Forget every snapshot without touching the database.
    pub fn flush_sync_data(&self) {
        for (_, info) in self.inner.lock().resources_mut() {
            info.sync_data = None;
        }
    }

    /// Keys of every snapshot, which are consumed.
    pub fn get_expired_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for (_, info) in self.inner.lock().resources_mut() {
            if let Some(snapshot) = info.sync_data.take() {
                keys.extend(snapshot.into_keys());
            }
        }
        keys
    }

    pub fn ref_count(&self, conn_string: &str) -> usize {
        self.inner.lock().ref_count(&pool_key(conn_string))
    }

    /// Pooled connection keys, lower-cased and sorted.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl std::fmt::Debug for DbConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConnectionPool")
            .field("connections", &self.len())
            .finish()
    }
}

fn pool_key(conn_string: &str) -> String {
    conn_string.to_lowercase()
}

fn ensure_open(conn: &mut dyn DbConnection) -> std::result::Result<(), PoolError> {
    if conn.state() != ConnectionState::Open {
        conn.open()?;
    }
    Ok(())
}

fn load_table_data(
    connection: &SharedConnection,
    sync_table: &str,
    cache_id: &str,
) -> std::result::Result<SyncSnapshot, PoolError> {
    let mut guard = connection.lock();
    let conn: &mut dyn DbConnection = &mut **guard;
    ensure_open(conn)?;
    conn.begin_transaction(IsolationLevel::RepeatableRead)?;

    match read_modified_keys(conn, sync_table, cache_id) {
        Ok(snapshot) => {
            conn.commit()?;
            Ok(snapshot)
        }
        Err(e) => {
            if let Err(rollback) = conn.rollback() {
                warn!(error = %rollback, "Rollback after sync failure failed");
            }
            Err(e)
        }
    }
}

fn read_modified_keys(
    conn: &mut dyn DbConnection,
    sync_table: &str,
    cache_id: &str,
) -> std::result::Result<SyncSnapshot, PoolError> {
    let params = [SqlValue::Text(cache_id.to_string())];

    conn.execute(
        &format!(
            "UPDATE {sync_table} SET WORK_IN_PROGRESS = 1 WHERE CACHE_ID = ? AND MODIFIED = 1"
        ),
        &params,
    )?;

    let rows = conn.query(
        &format!(
            "SELECT CACHE_KEY, MODIFIED FROM {sync_table} WHERE CACHE_ID = ? AND WORK_IN_PROGRESS = 1"
        ),
        &params,
    )?;

    let mut snapshot = SyncSnapshot::with_capacity(rows.len());
    for row in rows {
        let key = row.first().and_then(SqlValue::as_text);
        let modified = row.get(1).and_then(SqlValue::as_bool);
        match (key, modified) {
            (Some(key), Some(modified)) => {
                snapshot.insert(key, modified);
            }
            _ => {
                return Err(PoolError::StatementFailed(format!(
                    "unexpected sync row {row:?}"
                )))
            }
        }
    }
    Ok(snapshot)
}

fn remove_table_data(
    connection: &SharedConnection,
    sync_table: &str,
    cache_id: &str,
) -> std::result::Result<u64, PoolError> {
    let mut guard = connection.lock();
    let conn: &mut dyn DbConnection = &mut **guard;
    ensure_open(conn)?;
    conn.execute(
        &format!("DELETE FROM {sync_table} WHERE CACHE_ID = ? AND WORK_IN_PROGRESS = 1"),
        &[SqlValue::Text(cache_id.to_string())],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::connection::ScriptedConnection;

    const TABLE: &str = "ncache_db_sync";

    fn pool() -> (DbConnectionPool, Arc<CoordinationMetrics>) {
        let metrics = Arc::new(CoordinationMetrics::new());
        (DbConnectionPool::new(metrics.clone()), metrics)
    }

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn test_reference_counting() {
        let (pool, metrics) = pool();
        let first = ScriptedConnection::new();
        let probe = first.clone();

        pool.pool_connection("Server=A", Box::new(first)).unwrap();
        pool.pool_connection("server=a", Box::new(ScriptedConnection::new()))
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.ref_count("SERVER=A"), 2);
        assert_eq!(metrics.connections_pooled.get(), 1);

        pool.remove_connection("server=a");
        assert_eq!(pool.len(), 1);
        assert_eq!(probe.state(), ConnectionState::Open);

        pool.remove_connection("server=a");
        assert!(pool.is_empty());
        assert_eq!(probe.state(), ConnectionState::Closed);
        assert_eq!(metrics.connections_pooled.get(), 0);
        assert_eq!(metrics.connections_evicted.get(), 1);

        // Unknown key.
        pool.remove_connection("server=a");
        assert!(pool.is_empty());
        assert_eq!(metrics.connections_evicted.get(), 1);
    }

    #[test]
    fn test_pooled_connection_reopened_when_closed() {
        let (pool, _) = pool();
        let first = ScriptedConnection::new();
        let probe = first.clone();
        pool.pool_connection("db", Box::new(first)).unwrap();

        probe.set_state(ConnectionState::Broken);
        let replacement = ScriptedConnection::new();
        let unused = replacement.clone();
        let conn = pool.pool_connection("db", Box::new(replacement)).unwrap();

        assert_eq!(conn.lock().state(), ConnectionState::Open);
        assert_eq!(probe.open_count(), 2);
        assert_eq!(unused.open_count(), 0);
        assert_eq!(pool.ref_count("db"), 2);
    }

    #[test]
    fn test_open_failure_does_not_pool() {
        let (pool, metrics) = pool();
        let conn = ScriptedConnection::new();
        conn.fail_open(true);

        let result = pool.pool_connection("db", Box::new(conn));
        assert!(matches!(result, Err(Error::Pool(PoolError::OpenFailed(_)))));
        assert!(pool.is_empty());
        assert_eq!(metrics.connections_pooled.get(), 0);
    }

    #[test]
    fn test_severed_connection_evicted_regardless_of_references() {
        let (pool, _) = pool();
        let conn = ScriptedConnection::new();
        let probe = conn.clone();
        pool.pool_connection("db", Box::new(conn)).unwrap();
        pool.pool_connection("db", Box::new(ScriptedConnection::new()))
            .unwrap();

        pool.remove_severed_connection("DB");
        assert!(pool.get_connection("db").is_none());
        assert_eq!(probe.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_acquire_sync_data_snapshots_modified_rows() {
        let (pool, _) = pool();
        let conn = ScriptedConnection::new()
            .with_row("orders", "k1", true)
            .with_row("orders", "k2", true)
            .with_row("orders", "k3", false)
            .with_row("users", "u1", true);
        let probe = conn.clone();
        pool.pool_connection("db", Box::new(conn)).unwrap();

        pool.acquire_sync_data(TABLE, "orders").unwrap();

        let snapshot = pool.get_resource_sync_info("db").unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("k1"), Some(&true));
        assert!(!snapshot.contains_key("k3"));
        assert_eq!(probe.committed(), 1);
        assert!(probe
            .statements()
            .iter()
            .all(|sql| sql.contains(TABLE) && !sql.contains("orders")));
    }

    #[test]
    fn test_snapshot_failure_is_isolated_per_connection() {
        let (pool, metrics) = pool();
        let good = ScriptedConnection::new().with_row("orders", "k1", true);
        let bad = ScriptedConnection::new().with_row("orders", "k2", true);
        bad.fail_on("SELECT");
        let bad_probe = bad.clone();
        pool.pool_connection("good", Box::new(good)).unwrap();
        pool.pool_connection("bad", Box::new(bad)).unwrap();

        pool.acquire_sync_data(TABLE, "orders").unwrap();

        assert!(pool.get_resource_sync_info("good").is_some());
        assert!(pool.get_resource_sync_info("bad").is_none());
        assert_eq!(bad_probe.rolled_back(), 1);
        assert!(!bad_probe.row_in_progress("k2"));
        assert_eq!(metrics.sync_snapshot_failures.get(), 1);
    }

    #[test]
    fn test_expired_keys_are_drained_once() {
        let (pool, _) = pool();
        pool.pool_connection(
            "a",
            Box::new(ScriptedConnection::new().with_row("orders", "k1", true)),
        )
        .unwrap();
        pool.pool_connection(
            "b",
            Box::new(ScriptedConnection::new().with_row("orders", "k2", true)),
        )
        .unwrap();

        pool.acquire_sync_data(TABLE, "orders").unwrap();
        assert_eq!(sorted(pool.get_expired_keys()), vec!["k1", "k2"]);
        assert!(pool.get_expired_keys().is_empty());
    }

    #[test]
    fn test_remove_sync_data_deletes_in_progress_rows() {
        let (pool, _) = pool();
        let conn = ScriptedConnection::new()
            .with_row("orders", "k1", true)
            .with_row("orders", "k2", false);
        let probe = conn.clone();
        pool.pool_connection("db", Box::new(conn)).unwrap();

        pool.acquire_sync_data(TABLE, "orders").unwrap();
        pool.remove_sync_data(TABLE, "orders").unwrap();

        assert!(pool.get_resource_sync_info("db").is_none());
        assert_eq!(probe.row_keys(), vec!["k2".to_string()]);
    }

    #[test]
    fn test_flush_sync_data() {
        let (pool, _) = pool();
        pool.pool_connection(
            "db",
            Box::new(ScriptedConnection::new().with_row("orders", "k1", true)),
        )
        .unwrap();
        pool.acquire_sync_data(TABLE, "orders").unwrap();

        pool.flush_sync_data();
        assert!(pool.get_resource_sync_info("db").is_none());
        assert!(pool.get_expired_keys().is_empty());
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let (pool, _) = pool();
        pool.pool_connection("db", Box::new(ScriptedConnection::new()))
            .unwrap();

        let result = pool.acquire_sync_data("sync; DROP TABLE x", "orders");
        assert!(matches!(
            result,
            Err(Error::Pool(PoolError::InvalidTableName(_)))
        ));
    }
}
