//! Contract of the authoritative cache engine.
//!
//! The engine owns storage and whatever locking concurrent mutation needs.
//! Async tasks and enumerators in this crate only call through this trait.

use crate::cache::entry::{CacheEntry, EvictionHint, ExpirationHint, GroupInfo, QueryInfo};
use crate::error::Result;
use crate::types::BitSet;
use bytes::Bytes;
use std::collections::HashMap;

/// Keys of the operation context bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationContextField {
    /// Kind of the operation (client, cluster or local).
    OperationType,
    /// Do not wait on graceful-shutdown barriers.
    NoGracefulBlock,
    /// Id of the client that issued the request.
    ClientId,
    /// Raise notifications for this operation.
    RaiseNotification,
}

/// Values stored in the operation context bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    Bool(bool),
    Text(String),
}

/// Per-call bag of operation attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationContext {
    fields: HashMap<OperationContextField, ContextValue>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: OperationContextField, value: ContextValue) -> Self {
        self.add(field, value);
        self
    }

    /// Insert or replace a field.
    pub fn add(&mut self, field: OperationContextField, value: ContextValue) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: OperationContextField) -> Option<&ContextValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: OperationContextField) -> bool {
        self.fields.contains_key(&field)
    }

    /// True when the field holds `Bool(true)`.
    pub fn is_set(&self, field: OperationContextField) -> bool {
        matches!(self.fields.get(&field), Some(ContextValue::Bool(true)))
    }
}

/// Notification descriptor registered by a client for an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEntry {
    pub client_id: String,
    pub callback_id: u16,
}

impl CallbackEntry {
    pub fn new(client_id: impl Into<String>, callback_id: u16) -> Self {
        Self {
            client_id: client_id.into(),
            callback_id,
        }
    }
}

/// Value plus the hints of a write operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheItem {
    pub value: Bytes,
    pub expiration: Option<ExpirationHint>,
    pub eviction: Option<EvictionHint>,
    pub group: Option<GroupInfo>,
    pub query_info: Option<QueryInfo>,
    pub flags: BitSet,
}

impl CacheItem {
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            value: value.into(),
            expiration: None,
            eviction: None,
            group: None,
            query_info: None,
            flags: BitSet::new(),
        }
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

    pub fn with_query_info(mut self, query_info: QueryInfo) -> Self {
        self.query_info = Some(query_info);
        self
    }

    pub fn with_flags(mut self, flags: BitSet) -> Self {
        self.flags = flags;
        self
    }

    /// Build the entry the engine stores for this item.
    pub fn to_entry(&self) -> CacheEntry {
        let mut entry = CacheEntry::new(self.value.clone()).with_flags(self.flags);
        if let Some(hint) = self.expiration {
            entry = entry.with_expiration(hint);
        }
        if let Some(hint) = self.eviction {
            entry = entry.with_eviction(hint);
        }
        if let Some(group) = &self.group {
            entry = entry.with_group(group.clone());
        }
        entry
    }
}

/// Synchronous operations of the authoritative cache engine.
///
/// Failures are reported as errors (for example an existing key on `add`).
pub trait CacheEngine: Send + Sync {
    /// Add an item; fails if the key already exists.
    fn add(
        &self,
        key: &Bytes,
        item: &CacheItem,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<()>;

    /// Insert or overwrite an item; returns the new item version.
    fn insert(
        &self,
        key: &Bytes,
        item: &CacheItem,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<u64>;

    /// Remove an item, returning the removed entry if it existed.
    fn remove(
        &self,
        key: &Bytes,
        flags: BitSet,
        notification: Option<&CallbackEntry>,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<Option<CacheEntry>>;

    /// Remove every item.
    fn clear(
        &self,
        flags: BitSet,
        notification: Option<&CallbackEntry>,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<()>;

    /// Fetch an item.
    fn get(&self, key: &Bytes, context: &OperationContext) -> Result<Option<CacheEntry>>;
}
