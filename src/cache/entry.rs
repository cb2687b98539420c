//! Stored cache entries and the hints that travel with them.

use crate::error::Result;
use crate::types::{BitSet, LockId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flag bits stored on a [`CacheEntry`].
pub mod flags {
    /// Value bytes are LZ4 compressed with the size prepended.
    pub const COMPRESSED: u8 = 0x02;
    /// Value is opaque binary data rather than a serialized object.
    pub const BINARY: u8 = 0x08;
}

/// Expiration attached to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirationHint {
    /// Expires at an absolute time (ms since Unix epoch).
    Absolute { expires_at_ms: u64 },
    /// Expires after being idle for the given time.
    Sliding { idle_ms: u64 },
}

/// Priority used by the eviction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvictionHint {
    Low,
    BelowNormal,
    #[default]
    Normal,
    AboveNormal,
    High,
    NotRemovable,
}

/// Group and optional subgroup tag of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group: String,
    pub subgroup: Option<String>,
}

impl GroupInfo {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            subgroup: None,
        }
    }

    pub fn with_subgroup(mut self, subgroup: impl Into<String>) -> Self {
        self.subgroup = Some(subgroup.into());
        self
    }
}

/// Attribute values indexed for queries.
pub type QueryInfo = BTreeMap<String, String>;

/// Lock state of an item as reported by a node.
///
/// A `None` lock id means the item was not present on that node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockOptions {
    pub lock_id: Option<LockId>,
    pub lock_date_ms: u64,
}

impl LockOptions {
    pub fn locked(lock_id: impl Into<LockId>, lock_date_ms: u64) -> Self {
        Self {
            lock_id: Some(lock_id.into()),
            lock_date_ms,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}

/// A value as stored by the cache engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    value: Bytes,
    flags: BitSet,
    expiration: Option<ExpirationHint>,
    eviction: Option<EvictionHint>,
    group: Option<GroupInfo>,
    lock: Option<LockOptions>,
    version: u64,
}

impl CacheEntry {
    /// Create an entry holding the value as-is.
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            value: value.into(),
            flags: BitSet::new(),
            expiration: None,
            eviction: None,
            group: None,
            lock: None,
            version: 1,
        }
    }

    /// Create an entry whose value is stored compressed.
    pub fn compressed(value: &[u8]) -> Self {
        let packed = lz4_flex::compress_prepend_size(value);
        let mut entry = Self::new(packed);
        entry.flags.set_bit(flags::COMPRESSED);
        entry
    }

    pub fn with_flags(mut self, flags: BitSet) -> Self {
        self.flags.set_bit(flags.bits());
        self
    }

    pub fn with_expiration(mut self, hint: ExpirationHint) -> Self {
        self.expiration = Some(hint);
        self
    }

    pub fn with_eviction(mut self, hint: EvictionHint) -> Self {
        self.eviction = Some(hint);
        self
    }

    pub fn with_group(mut self, group: GroupInfo) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Stored bytes, possibly compressed.
    pub fn raw_value(&self) -> &Bytes {
        &self.value
    }

    /// The user value, decompressed when the entry is stored compressed.
    pub fn deflatted_value(&self) -> Result<Bytes> {
        if self.flags.is_bit_set(flags::COMPRESSED) {
            let plain = lz4_flex::decompress_size_prepended(&self.value)?;
            Ok(Bytes::from(plain))
        } else {
            Ok(self.value.clone())
        }
    }

    pub fn flags(&self) -> BitSet {
        self.flags
    }

    pub fn expiration(&self) -> Option<&ExpirationHint> {
        self.expiration.as_ref()
    }

    pub fn eviction(&self) -> Option<EvictionHint> {
        self.eviction
    }

    pub fn group(&self) -> Option<&GroupInfo> {
        self.group.as_ref()
    }

    pub fn lock(&self) -> Option<&LockOptions> {
        self.lock.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Serialize entry to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize entry from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}
