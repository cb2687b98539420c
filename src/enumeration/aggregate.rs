//! Concatenation of several cursors.

use super::{out_of_range, CacheCursor};
use crate::error::Result;
use bytes::Bytes;

/// Presents several cursors (for example one per partition) as one.
///
/// Elements come in concatenation order: each part is exhausted, reset and
/// left behind before the next one starts. Accessors delegate to the part
/// currently active.
pub struct AggregateEnumerator {
    parts: Vec<Box<dyn CacheCursor + Send>>,
    current: usize,
}

impl AggregateEnumerator {
    pub fn new(parts: Vec<Box<dyn CacheCursor + Send>>) -> Self {
        Self { parts, current: 0 }
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn active(&self) -> Result<&(dyn CacheCursor + Send)> {
        self.parts
            .get(self.current)
            .map(|part| part.as_ref())
            .ok_or_else(out_of_range)
    }
}

impl CacheCursor for AggregateEnumerator {
    fn move_next(&mut self) -> bool {
        while let Some(part) = self.parts.get_mut(self.current) {
            if part.move_next() {
                return true;
            }
            part.reset();
            self.current += 1;
        }
        false
    }

    fn reset(&mut self) {
        for part in &mut self.parts {
            part.reset();
        }
        self.current = 0;
    }

    fn key(&self) -> Result<&Bytes> {
        self.active()?.key()
    }

    fn value(&mut self) -> Result<Option<Bytes>> {
        match self.parts.get_mut(self.current) {
            Some(part) => part.value(),
            None => Err(out_of_range()),
        }
    }
}

impl std::fmt::Debug for AggregateEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateEnumerator")
            .field("parts", &self.parts.len())
            .field("current", &self.current)
            .finish()
    }
}
