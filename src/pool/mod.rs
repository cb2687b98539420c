//! Database connection pooling for sync-table change tracking.
//!
//! The cache watches a database table for rows flagged as modified. Each
//! distinct connection string is opened once and shared through
//! [`DbConnectionPool`]; a sync pass marks the modified rows of one cache as
//! in progress, snapshots their keys, and later deletes them.
//!
//! ```text
//!   acquire_sync_data ──▶ UPDATE .. WORK_IN_PROGRESS = 1  ─┐
//!                         SELECT CACHE_KEY, MODIFIED      ─┤ one transaction
//!                                                          ▼ per connection
//!   get_expired_keys  ──▶ drain snapshots
//!   remove_sync_data  ──▶ DELETE .. WORK_IN_PROGRESS = 1
//! ```

pub mod connection;
pub mod db_pool;
pub mod resource_pool;

pub use connection::{ConnectionState, DbConnection, IsolationLevel, Row, SharedConnection, SqlValue};
pub use db_pool::{DbConnectionPool, SyncSnapshot};
pub use resource_pool::ResourcePool;
