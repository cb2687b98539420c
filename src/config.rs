//! Configuration types.

use crate::error::{PoolError, Result};
use std::time::Duration;

/// Configuration for the async task processor.
#[derive(Debug, Clone)]
pub struct AsyncProcessorConfig {
    /// Number of worker tasks draining the queues. Values below 1 are raised to 1.
    pub worker_count: usize,

    /// How long `wait_for_shutdown` waits for pending tasks by default.
    pub shutdown_timeout: Duration,
}

impl Default for AsyncProcessorConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl AsyncProcessorConfig {
    /// Create a config with the given worker count.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            ..Default::default()
        }
    }

    /// Set the worker count.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    /// Set the default shutdown wait.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Configuration of the database sync table used for dependency tracking.
#[derive(Debug, Clone)]
pub struct DbSyncConfig {
    /// Name of the table holding modified-row markers.
    pub sync_table: String,

    /// Cache identifier stored in the `CACHE_ID` column.
    pub cache_id: String,
}

impl Default for DbSyncConfig {
    fn default() -> Self {
        Self {
            sync_table: "ncache_db_sync".to_string(),
            cache_id: String::new(),
        }
    }
}

impl DbSyncConfig {
    /// Create a config for the given table and cache.
    pub fn new(sync_table: impl Into<String>, cache_id: impl Into<String>) -> Self {
        Self {
            sync_table: sync_table.into(),
            cache_id: cache_id.into(),
        }
    }

    /// Set the sync table name.
    pub fn with_sync_table(mut self, sync_table: impl Into<String>) -> Self {
        self.sync_table = sync_table.into();
        self
    }

    /// Set the cache id.
    pub fn with_cache_id(mut self, cache_id: impl Into<String>) -> Self {
        self.cache_id = cache_id.into();
        self
    }

    /// Check that the table name can be spliced into a statement.
    ///
    /// Only the table name is spliced; the cache id is always bound as a parameter.
    pub fn validate(&self) -> Result<()> {
        let valid = !self.sync_table.is_empty()
            && self
                .sync_table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if valid {
            Ok(())
        } else {
            Err(PoolError::InvalidTableName(self.sync_table.clone()).into())
        }
    }
}

/// Configuration for enumerators.
#[derive(Debug, Clone, Default)]
pub struct EnumerationConfig {
    /// Whether a key whose value is missing yields `None` instead of an error.
    pub allow_nulls: bool,
}

impl EnumerationConfig {
    /// Allow or forbid missing values.
    pub fn with_allow_nulls(mut self, allow: bool) -> Self {
        self.allow_nulls = allow;
        self
    }
}

/// Configuration for the local reference engine.
#[derive(Debug, Clone)]
pub struct LocalCacheConfig {
    /// Maximum number of entries.
    pub max_capacity: u64,

    /// Default time-to-live for entries.
    pub default_ttl: Option<Duration>,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
            default_ttl: None,
        }
    }
}

impl LocalCacheConfig {
    /// Set maximum capacity.
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Set default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }
}
