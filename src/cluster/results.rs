//! Result shapes produced by cluster members and by reconciliation.

use crate::cache::entry::CacheEntry;
use crate::types::LockId;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Outcome of an add operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheAddResult {
    Success,
    SuccessNearEviction,
    KeyExists,
    NeedsEviction,
    Failure,
    /// Stored on some members, timed out on others.
    PartialTimeout,
    /// Timed out everywhere; nothing to roll back.
    FullTimeout,
}

/// Outcome of an insert operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheInsResult {
    Success,
    SuccessOverwrite,
    SuccessNearEviction,
    SuccessOverwriteNearEviction,
    Failure,
    NeedsEviction,
    /// Every member asked for eviction, so nothing was stored and nothing
    /// has to be removed.
    NeedsEvictionNotRemove,
    IncompatibleGroup,
    DependencyKeyNotExist,
    DependencyKeyError,
    ItemLocked,
    PartialTimeout,
    FullTimeout,
}

impl CacheInsResult {
    /// Whether the member stored the item.
    pub fn is_success(&self) -> bool {
        matches!(self, CacheInsResult::Success | CacheInsResult::SuccessOverwrite)
    }
}

/// Insert outcome plus the entry that was overwritten, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInsResultWithEntry {
    pub result: CacheInsResult,
    pub entry: Option<CacheEntry>,
}

impl Default for CacheInsResultWithEntry {
    fn default() -> Self {
        Self {
            result: CacheInsResult::Failure,
            entry: None,
        }
    }
}

impl CacheInsResultWithEntry {
    pub fn new(result: CacheInsResult) -> Self {
        Self {
            result,
            entry: None,
        }
    }

    pub fn with_entry(mut self, entry: CacheEntry) -> Self {
        self.entry = Some(entry);
        self
    }
}

/// Status of a generic cluster-wide operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterOperationStatus {
    Completed,
    Failed,
    PartialTimeout,
    FullTimeout,
}

/// Result of a generic cluster-wide operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterOperationResult {
    pub status: ClusterOperationStatus,
    pub detail: Option<String>,
}

impl ClusterOperationResult {
    pub fn new(status: ClusterOperationStatus) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Position of a server-side enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationPointer {
    pub id: String,
    /// Chunk sequence number; `-1` once the last chunk was handed out.
    pub chunk_id: i32,
}

impl EnumerationPointer {
    pub fn new(id: impl Into<String>, chunk_id: i32) -> Self {
        Self {
            id: id.into(),
            chunk_id,
        }
    }

    pub fn is_last(&self) -> bool {
        self.chunk_id == -1
    }
}

/// One page of keys of a server-side enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationDataChunk {
    pub pointer: EnumerationPointer,
    pub data: Vec<Bytes>,
}

impl EnumerationDataChunk {
    pub fn is_last_chunk(&self) -> bool {
        self.pointer.is_last()
    }
}

/// Decision of a replicated lock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOutcome {
    /// Whether the lock is held by the requested id on every responding member.
    pub acquired: bool,
    /// On success the requested id; on conflict the id of the current holder.
    pub lock_id: Option<LockId>,
    /// Lock date reported alongside `lock_id`.
    pub lock_date_ms: u64,
}
