//! Cluster coordination layer for a distributed cache.
//!
//! This crate sits between the cluster transport and the local cache engine.
//! It provides:
//! - **Response reconciliation** that turns per-node answers into one result
//! - **Async tasks** for fire-and-forget add, insert, remove and clear
//! - **Enumerators** over local contents, lazy key sets and their concatenation
//! - **A database connection pool** that snapshots sync-table changes
//!
//! # Example
//!
//! ```rust,no_run
//! use quorum_cache::cache::{CacheItem, LocalCache};
//! use quorum_cache::config::{AsyncProcessorConfig, LocalCacheConfig};
//! use quorum_cache::metrics::CoordinationMetrics;
//! use quorum_cache::tasks::{
//!     AsyncAdd, AsyncCallbackInfo, AsyncCompletion, AsyncProcessor, CompletionDispatcher,
//!     TaskRuntime,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(LocalCache::new(&LocalCacheConfig::default()));
//!     let metrics = Arc::new(CoordinationMetrics::new());
//!
//!     // Completions are delivered off the worker threads
//!     let (sender, _dispatcher) = CompletionDispatcher::spawn(Arc::new(
//!         |completion: &AsyncCompletion| println!("{:?}", completion.result),
//!     ));
//!     let runtime = TaskRuntime::new(engine, sender, metrics);
//!
//!     let processor = AsyncProcessor::new(AsyncProcessorConfig::new(4), runtime);
//!     processor.start();
//!
//!     processor.enqueue(Box::new(
//!         AsyncAdd::new("user:123", CacheItem::new("Alice"))
//!             .with_callback(AsyncCallbackInfo::new(1, "client-1", 7)),
//!     ))?;
//!
//!     processor.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        Cluster transport (external)          │
//! └──────────────────────────────────────────────┘
//!                      │ RspList
//!                      ▼
//! ┌──────────────────────────────────────────────┐
//! │            cluster::reconcile                │
//! │  • reconcile_add / insert / remove / lock    │
//! │  • bulk, lookup, validation, statistics      │
//! └──────────────────────────────────────────────┘
//!
//! ┌─────────────┐   ┌──────────────┐   ┌────────────┐
//! │    tasks    │   │ enumeration  │   │    pool    │
//! │AsyncProcessor│  │   cursors    │   │ DbConnection│
//! └─────────────┘   └──────────────┘   └────────────┘
//!        │                 │                  │
//!        ▼                 ▼                  ▼
//! ┌─────────────┐                      ┌────────────┐
//! │ CacheEngine │                      │  database  │
//! └─────────────┘                      └────────────┘
//! ```
//!
//! # Consistency Model
//!
//! - **Reconciliation**: pure; suspected nodes are excluded, timeouts are
//!   reported as partial or full
//! - **Async tasks**: at most one completion per task, failures only through
//!   the callback
//! - **Enumeration**: not snapshot-isolated

pub mod cache;
pub mod cluster;
pub mod config;
pub mod enumeration;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod tasks;
pub mod testing;
pub mod types;

// Re-export main types for convenience
pub use cache::{CacheEngine, CacheEntry, CacheItem, LocalCache, OperationContext};
pub use config::{AsyncProcessorConfig, DbSyncConfig, EnumerationConfig, LocalCacheConfig};
pub use error::{Error, PoolError, Result};
pub use types::{BitSet, LockId, NodeId};

// Re-export cluster types
pub use cluster::{
    CacheAddResult, CacheInsResult, CacheInsResultWithEntry, ClusterCacheStatistics,
    ClusterOperationResult, LockOutcome, ResponseKind, Rsp, RspList, RspValue,
};

// Re-export task types
pub use tasks::{
    AsyncAdd, AsyncClear, AsyncCompletion, AsyncInsert, AsyncOpCode, AsyncOpResult,
    AsyncProcessor, AsyncRemove, AsyncTask, CompletionDispatcher, CompletionListener, TaskRuntime,
};

// Re-export enumeration types
pub use enumeration::{AggregateEnumerator, CacheCursor, CacheEnumerator, LazyKeysetEnumerator};

// Re-export pool types
pub use pool::{DbConnection, DbConnectionPool, ResourcePool};

// Re-export metrics types
pub use metrics::{CoordinationMetrics, MetricsSnapshot};
