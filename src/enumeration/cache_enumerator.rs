//! Cursor over stored entries with lazy value decoding.

use super::{out_of_range, CacheCursor};
use crate::cache::entry::CacheEntry;
use crate::cache::local::LocalCache;
use crate::error::Result;
use bytes::Bytes;
use moka::sync::Cache;

#[derive(Clone)]
enum Source {
    /// Entries handed over up front, such as a received enumeration chunk.
    Owned(Vec<(Bytes, CacheEntry)>),
    /// Keys of a local store. Entries are looked up as the cursor reaches
    /// them; keys removed since the snapshot are skipped.
    Local {
        store: Cache<Bytes, CacheEntry>,
        keys: Vec<Bytes>,
    },
}

impl Source {
    fn len(&self) -> usize {
        match self {
            Source::Owned(entries) => entries.len(),
            Source::Local { keys, .. } => keys.len(),
        }
    }

    fn load(&self, index: usize) -> Option<(Bytes, CacheEntry)> {
        match self {
            Source::Owned(entries) => entries.get(index).cloned(),
            Source::Local { store, keys } => {
                let key = keys.get(index)?;
                store.get(key).map(|entry| (key.clone(), entry))
            }
        }
    }
}

/// Walks stored entries and decodes a value only when it is read.
///
/// Over a local cache only the keys are captured up front; each entry is
/// fetched when the cursor moves onto it. Compressed values are inflated on
/// first access per position and kept for repeat reads at the same position.
#[derive(Clone)]
pub struct CacheEnumerator {
    source: Source,
    /// Index of the next slot `move_next` will try.
    next: usize,
    current: Option<(Bytes, CacheEntry)>,
    decoded: Option<Bytes>,
}

impl CacheEnumerator {
    pub fn new(entries: Vec<(Bytes, CacheEntry)>) -> Self {
        Self::from_source(Source::Owned(entries))
    }

    /// Cursor over whatever the local cache holds right now.
    pub fn over(cache: &LocalCache) -> Self {
        Self::from_source(Source::Local {
            store: cache.store(),
            keys: cache.keys(),
        })
    }

    fn from_source(source: Source) -> Self {
        Self {
            source,
            next: 0,
            current: None,
            decoded: None,
        }
    }

    fn current(&self) -> Result<&(Bytes, CacheEntry)> {
        self.current.as_ref().ok_or_else(out_of_range)
    }

    /// Stored entry at the current position, value still encoded.
    pub fn raw_entry(&self) -> Result<&CacheEntry> {
        Ok(&self.current()?.1)
    }
}

impl CacheCursor for CacheEnumerator {
    fn move_next(&mut self) -> bool {
        self.decoded = None;
        self.current = None;

        while self.next < self.source.len() {
            let index = self.next;
            self.next += 1;
            if let Some(entry) = self.source.load(index) {
                self.current = Some(entry);
                return true;
            }
        }
        false
    }

    fn reset(&mut self) {
        self.next = 0;
        self.current = None;
        self.decoded = None;
    }

    fn key(&self) -> Result<&Bytes> {
        Ok(&self.current()?.0)
    }

    fn value(&mut self) -> Result<Option<Bytes>> {
        if let Some(value) = &self.decoded {
            return Ok(Some(value.clone()));
        }

        let value = self.current()?.1.deflatted_value()?;
        self.decoded = Some(value.clone());
        Ok(Some(value))
    }
}

impl std::fmt::Debug for CacheEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEnumerator")
            .field("len", &self.source.len())
            .field("next", &self.next)
            .field("key", &self.current.as_ref().map(|(k, _)| k))
            .finish()
    }
}
