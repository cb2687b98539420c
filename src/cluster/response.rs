//! Per-member responses to one broadcast operation.
//!
//! The transport fills an [`RspList`] with one [`Rsp`] per addressed member.
//! Payloads are a tagged union so reconciliation can check the payload kind
//! explicitly instead of inspecting runtime types.

use crate::cache::entry::{CacheEntry, LockOptions};
use crate::cluster::results::{
    CacheAddResult, CacheInsResultWithEntry, ClusterOperationResult, EnumerationDataChunk,
};
use crate::cluster::statistics::CacheStatistics;
use crate::error::Error;
use crate::types::NodeId;
use bytes::Bytes;
use std::collections::HashMap;

/// Discriminant of [`RspValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Error,
    AddResult,
    InsertResult,
    Entry,
    Lock,
    Bool,
    Keys,
    KeyedEntries,
    Chunk,
    ClusterOperation,
    Statistics,
}

/// Payload returned by one member.
#[derive(Debug, Clone, PartialEq)]
pub enum RspValue {
    /// The member raised an error.
    Error(Error),
    AddResult(CacheAddResult),
    /// Insert outcome; `None` when the member returned an empty payload.
    InsertResult(Option<CacheInsResultWithEntry>),
    Entry(CacheEntry),
    Lock(LockOptions),
    Bool(bool),
    /// Key list, e.g. the keys a bulk operation failed for.
    Keys(Vec<Bytes>),
    /// Keyed entries, e.g. the items a bulk insert stored or a bulk remove removed.
    KeyedEntries(HashMap<Bytes, CacheEntry>),
    Chunk(EnumerationDataChunk),
    ClusterOperation(ClusterOperationResult),
    Statistics(CacheStatistics),
}

impl RspValue {
    pub fn kind(&self) -> ResponseKind {
        match self {
            RspValue::Error(_) => ResponseKind::Error,
            RspValue::AddResult(_) => ResponseKind::AddResult,
            RspValue::InsertResult(_) => ResponseKind::InsertResult,
            RspValue::Entry(_) => ResponseKind::Entry,
            RspValue::Lock(_) => ResponseKind::Lock,
            RspValue::Bool(_) => ResponseKind::Bool,
            RspValue::Keys(_) => ResponseKind::Keys,
            RspValue::KeyedEntries(_) => ResponseKind::KeyedEntries,
            RspValue::Chunk(_) => ResponseKind::Chunk,
            RspValue::ClusterOperation(_) => ResponseKind::ClusterOperation,
            RspValue::Statistics(_) => ResponseKind::Statistics,
        }
    }
}

/// How a member's response was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    /// Answered in time and not suspected.
    Received,
    /// Marked failed by the failure detector.
    Suspected,
    /// Neither answered nor suspected.
    TimedOut,
}

/// One member's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Rsp {
    sender: NodeId,
    value: Option<RspValue>,
    received: bool,
    suspected: bool,
}

impl Rsp {
    /// A received response carrying a payload.
    pub fn received(sender: NodeId, value: RspValue) -> Self {
        Self {
            sender,
            value: Some(value),
            received: true,
            suspected: false,
        }
    }

    /// A received response without a payload.
    pub fn received_empty(sender: NodeId) -> Self {
        Self {
            sender,
            value: None,
            received: true,
            suspected: false,
        }
    }

    /// A member that did not answer in time.
    pub fn timed_out(sender: NodeId) -> Self {
        Self {
            sender,
            value: None,
            received: false,
            suspected: false,
        }
    }

    /// A member suspected failed.
    pub fn suspected(sender: NodeId) -> Self {
        Self {
            sender,
            value: None,
            received: false,
            suspected: true,
        }
    }

    pub fn sender(&self) -> NodeId {
        self.sender
    }

    pub fn value(&self) -> Option<&RspValue> {
        self.value.as_ref()
    }

    pub fn was_received(&self) -> bool {
        self.received
    }

    pub fn was_suspected(&self) -> bool {
        self.suspected
    }

    /// Suspicion wins over reception.
    pub fn state(&self) -> ResponseState {
        if self.suspected {
            ResponseState::Suspected
        } else if self.received {
            ResponseState::Received
        } else {
            ResponseState::TimedOut
        }
    }
}

/// Ordered responses of one broadcast, one per addressed member.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RspList {
    rsps: Vec<Rsp>,
}

impl RspList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rsp(&mut self, rsp: Rsp) {
        self.rsps.push(rsp);
    }

    pub fn len(&self) -> usize {
        self.rsps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rsps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rsp> {
        self.rsps.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rsp> {
        self.rsps.iter()
    }

    /// Drop responses that do not satisfy the predicate.
    pub fn retain<F: FnMut(&Rsp) -> bool>(&mut self, f: F) {
        self.rsps.retain(f);
    }

    /// Remove and return the response at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<Rsp> {
        if index < self.rsps.len() {
            Some(self.rsps.remove(index))
        } else {
            None
        }
    }
}

impl FromIterator<Rsp> for RspList {
    fn from_iter<I: IntoIterator<Item = Rsp>>(iter: I) -> Self {
        Self {
            rsps: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RspList {
    type Item = &'a Rsp;
    type IntoIter = std::slice::Iter<'a, Rsp>;

    fn into_iter(self) -> Self::IntoIter {
        self.rsps.iter()
    }
}
