//! Forward-only cursors over cache contents.
//!
//! A cursor starts before its first element. [`CacheCursor::move_next`]
//! advances it; the accessors fail before the first advance and after the
//! last one. Values are fetched or decoded on first access per position and
//! cached for repeat access.
//!
//! Cursors are single-consumer and not snapshot-isolated: concurrent
//! changes to the cache may or may not be observed.

pub mod aggregate;
pub mod cache_enumerator;
pub mod lazy_keyset;

pub use aggregate::AggregateEnumerator;
pub use cache_enumerator::CacheEnumerator;
pub use lazy_keyset::LazyKeysetEnumerator;

use crate::error::{Error, Result};
use bytes::Bytes;

/// Forward-only cursor over keys and their values.
pub trait CacheCursor {
    /// Advance to the next element; `false` once exhausted.
    fn move_next(&mut self) -> bool;

    /// Go back to before the first element.
    fn reset(&mut self);

    /// Key at the current position.
    fn key(&self) -> Result<&Bytes>;

    /// Value at the current position, fetched on first access.
    fn value(&mut self) -> Result<Option<Bytes>>;

    /// Key and value at the current position.
    fn entry(&mut self) -> Result<(Bytes, Option<Bytes>)> {
        let key = self.key()?.clone();
        let value = self.value()?;
        Ok((key, value))
    }

    /// Drive the cursor as an iterator of entries.
    fn into_entries(self) -> Entries<Self>
    where
        Self: Sized,
    {
        Entries { cursor: self }
    }
}

impl<C: CacheCursor + ?Sized> CacheCursor for Box<C> {
    fn move_next(&mut self) -> bool {
        (**self).move_next()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn key(&self) -> Result<&Bytes> {
        (**self).key()
    }

    fn value(&mut self) -> Result<Option<Bytes>> {
        (**self).value()
    }
}

/// Iterator over the entries of a cursor.
#[derive(Debug)]
pub struct Entries<C> {
    cursor: C,
}

impl<C> Entries<C> {
    pub fn into_inner(self) -> C {
        self.cursor
    }
}

impl<C: CacheCursor> Iterator for Entries<C> {
    type Item = Result<(Bytes, Option<Bytes>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.move_next() {
            Some(self.cursor.entry())
        } else {
            None
        }
    }
}

pub(crate) fn out_of_range() -> Error {
    Error::Enumeration("enumeration has either not started or has already finished".to_string())
}
