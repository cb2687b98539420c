//! A cache engine that records calls and can be told to fail.

use crate::cache::engine::{CacheEngine, CacheItem, CallbackEntry, OperationContext};
use crate::cache::entry::CacheEntry;
use crate::cache::local::LocalCache;
use crate::config::LocalCacheConfig;
use crate::error::{Error, Result};
use crate::types::BitSet;
use bytes::Bytes;
use parking_lot::Mutex;

/// One call observed by [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCall {
    pub op: &'static str,
    pub key: Option<Bytes>,
    pub flags: BitSet,
    pub notification: Option<CallbackEntry>,
    pub provider_name: Option<String>,
    pub context: OperationContext,
}

/// Wraps a [`LocalCache`], logging every call before delegating.
pub struct RecordingEngine {
    inner: LocalCache,
    calls: Mutex<Vec<EngineCall>>,
    fail_next: Mutex<Option<Error>>,
    panic_on_key: Mutex<Option<Bytes>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            inner: LocalCache::new(&LocalCacheConfig::default().with_max_capacity(10_000)),
            calls: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            panic_on_key: Mutex::new(None),
        }
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: Error) {
        *self.fail_next.lock() = Some(err);
    }

    /// Panic whenever `key` is touched.
    pub fn panic_on(&self, key: Bytes) {
        *self.panic_on_key.lock() = Some(key);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Keys of recorded calls, in call order.
    pub fn call_keys(&self) -> Vec<Option<Bytes>> {
        self.calls.lock().iter().map(|c| c.key.clone()).collect()
    }

    pub fn local(&self) -> &LocalCache {
        &self.inner
    }

    fn record(
        &self,
        op: &'static str,
        key: Option<&Bytes>,
        flags: BitSet,
        notification: Option<&CallbackEntry>,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<()> {
        if key.is_some() && self.panic_on_key.lock().as_ref() == key {
            panic!("engine panic on {op}");
        }

        self.calls.lock().push(EngineCall {
            op,
            key: key.cloned(),
            flags,
            notification: notification.cloned(),
            provider_name: provider_name.map(str::to_string),
            context: context.clone(),
        });

        match self.fail_next.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheEngine for RecordingEngine {
    fn add(
        &self,
        key: &Bytes,
        item: &CacheItem,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<()> {
        self.record("add", Some(key), item.flags, None, provider_name, context)?;
        self.inner.add(key, item, provider_name, context)
    }

    fn insert(
        &self,
        key: &Bytes,
        item: &CacheItem,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<u64> {
        self.record("insert", Some(key), item.flags, None, provider_name, context)?;
        self.inner.insert(key, item, provider_name, context)
    }

    fn remove(
        &self,
        key: &Bytes,
        flags: BitSet,
        notification: Option<&CallbackEntry>,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<Option<CacheEntry>> {
        self.record("remove", Some(key), flags, notification, provider_name, context)?;
        self.inner
            .remove(key, flags, notification, provider_name, context)
    }

    fn clear(
        &self,
        flags: BitSet,
        notification: Option<&CallbackEntry>,
        provider_name: Option<&str>,
        context: &OperationContext,
    ) -> Result<()> {
        self.record("clear", None, flags, notification, provider_name, context)?;
        self.inner.clear(flags, notification, provider_name, context)
    }

    fn get(&self, key: &Bytes, context: &OperationContext) -> Result<Option<CacheEntry>> {
        self.record("get", Some(key), BitSet::new(), None, None, context)?;
        self.inner.get(key, context)
    }
}
