//! Cursor over a fixed key list with values fetched on demand.

use super::{out_of_range, CacheCursor};
use crate::cache::engine::{CacheEngine, OperationContext};
use crate::config::EnumerationConfig;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::sync::Arc;

/// Walks a key list decided up front (for example by an index scan) and
/// loads each value from the engine only when it is asked for.
pub struct LazyKeysetEnumerator {
    engine: Arc<dyn CacheEngine>,
    keys: Vec<Bytes>,
    /// `None` before the first element; `keys.len()` once exhausted.
    position: Option<usize>,
    /// Value loaded for the current position, if any.
    fetched: Option<Option<Bytes>>,
    allow_nulls: bool,
    context: OperationContext,
}

impl LazyKeysetEnumerator {
    pub fn new(engine: Arc<dyn CacheEngine>, keys: Vec<Bytes>, config: &EnumerationConfig) -> Self {
        Self {
            engine,
            keys,
            position: None,
            fetched: None,
            allow_nulls: config.allow_nulls,
            context: OperationContext::new(),
        }
    }

    /// Context passed to every engine `get`.
    pub fn with_context(mut self, context: OperationContext) -> Self {
        self.context = context;
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn current_index(&self) -> Result<usize> {
        match self.position {
            Some(i) if i < self.keys.len() => Ok(i),
            _ => Err(out_of_range()),
        }
    }

    fn fetch(&self, key: &Bytes) -> Result<Option<Bytes>> {
        let value = match self.engine.get(key, &self.context)? {
            Some(entry) => Some(entry.deflatted_value()?),
            None => None,
        };

        if value.is_none() && !self.allow_nulls {
            return Err(Error::Enumeration(format!(
                "no value found for key {:?}",
                String::from_utf8_lossy(key)
            )));
        }
        Ok(value)
    }
}

impl CacheCursor for LazyKeysetEnumerator {
    fn move_next(&mut self) -> bool {
        let next = self.position.map_or(0, |i| i + 1).min(self.keys.len());
        self.position = Some(next);
        self.fetched = None;
        next < self.keys.len()
    }

    fn reset(&mut self) {
        self.position = None;
        self.fetched = None;
    }

    fn key(&self) -> Result<&Bytes> {
        let index = self.current_index()?;
        Ok(&self.keys[index])
    }

    fn value(&mut self) -> Result<Option<Bytes>> {
        let index = self.current_index()?;
        if let Some(cached) = &self.fetched {
            return Ok(cached.clone());
        }

        let value = self.fetch(&self.keys[index])?;
        self.fetched = Some(value.clone());
        Ok(value)
    }
}

impl std::fmt::Debug for LazyKeysetEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyKeysetEnumerator")
            .field("keys", &self.keys.len())
            .field("position", &self.position)
            .field("allow_nulls", &self.allow_nulls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::engine::CacheItem;
    use crate::testing::engine::RecordingEngine;

    fn seeded(keys: &[&'static str]) -> Arc<RecordingEngine> {
        let engine = Arc::new(RecordingEngine::new());
        for k in keys {
            engine
                .local()
                .insert(
                    &Bytes::from(*k),
                    &CacheItem::new(format!("value-{k}")),
                    None,
                    &OperationContext::new(),
                )
                .unwrap();
        }
        engine
    }

    fn keys(list: &[&'static str]) -> Vec<Bytes> {
        list.iter().map(|k| Bytes::from(*k)).collect()
    }

    fn gets(engine: &RecordingEngine) -> usize {
        engine.calls().iter().filter(|c| c.op == "get").count()
    }

    #[test]
    fn test_values_fetched_once_per_position() {
        let engine = seeded(&["a", "b"]);
        let mut cursor =
            LazyKeysetEnumerator::new(engine.clone(), keys(&["a", "b"]), &EnumerationConfig::default());

        assert!(cursor.move_next());
        assert_eq!(gets(&engine), 0);
        assert_eq!(cursor.value().unwrap(), Some(Bytes::from("value-a")));
        assert_eq!(cursor.value().unwrap(), Some(Bytes::from("value-a")));
        assert_eq!(gets(&engine), 1);

        assert!(cursor.move_next());
        assert_eq!(cursor.key().unwrap(), &Bytes::from("b"));
        assert_eq!(gets(&engine), 1);
        assert_eq!(cursor.entry().unwrap().1, Some(Bytes::from("value-b")));
        assert_eq!(gets(&engine), 2);

        assert!(!cursor.move_next());
        assert!(!cursor.move_next());
    }

    #[test]
    fn test_access_outside_range_fails() {
        let engine = seeded(&["a"]);
        let mut cursor =
            LazyKeysetEnumerator::new(engine, keys(&["a"]), &EnumerationConfig::default());

        assert!(matches!(cursor.key(), Err(Error::Enumeration(_))));
        assert!(cursor.move_next());
        assert!(!cursor.move_next());
        assert!(matches!(cursor.value(), Err(Error::Enumeration(_))));
    }

    #[test]
    fn test_missing_value_needs_allow_nulls() {
        let engine = seeded(&["a"]);
        let mut strict = LazyKeysetEnumerator::new(
            engine.clone(),
            keys(&["gone"]),
            &EnumerationConfig::default(),
        );
        assert!(strict.move_next());
        assert!(matches!(strict.value(), Err(Error::Enumeration(_))));

        let mut lenient = LazyKeysetEnumerator::new(
            engine,
            keys(&["gone"]),
            &EnumerationConfig::default().with_allow_nulls(true),
        );
        assert!(lenient.move_next());
        assert_eq!(lenient.value().unwrap(), None);
    }

    #[test]
    fn test_reset_restarts_and_refetches() {
        let engine = seeded(&["a", "b"]);
        let mut cursor =
            LazyKeysetEnumerator::new(engine.clone(), keys(&["a", "b"]), &EnumerationConfig::default());

        let mut first = Vec::new();
        while cursor.move_next() {
            first.push(cursor.key().unwrap().clone());
        }
        assert_eq!(first, keys(&["a", "b"]));

        cursor.reset();
        assert!(cursor.key().is_err());
        let entries: Vec<_> = cursor.into_entries().collect::<Result<_>>().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(gets(&engine), 2);
    }
}
