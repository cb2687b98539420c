//! Cluster responses and their reconciliation.
//!
//! The transport layer that broadcasts operations and collects answers lives
//! outside this crate. It hands over an [`RspList`]; the [`reconcile`]
//! functions turn that list into one authoritative result.

pub mod reconcile;
pub mod response;
pub mod results;
pub mod statistics;

pub use response::{ResponseKind, ResponseState, Rsp, RspList, RspValue};
pub use results::{
    CacheAddResult, CacheInsResult, CacheInsResultWithEntry, ClusterOperationResult,
    ClusterOperationStatus, EnumerationDataChunk, EnumerationPointer, LockOutcome,
};
pub use statistics::{node_status, CacheStatistics, ClusterCacheStatistics, NodeInfo};
