//! Lock-free metric instruments.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Monotonic counter.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    value: AtomicU64,
}

impl Counter {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Value that moves both ways, such as a queue depth.
#[derive(Debug)]
pub struct Gauge {
    name: &'static str,
    value: AtomicI64,
}

impl Gauge {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: AtomicI64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counter keyed by a fixed number of label values.
#[derive(Debug)]
pub struct LabeledCounter<const N: usize> {
    name: &'static str,
    label_names: [&'static str; N],
    series: RwLock<HashMap<[String; N], AtomicU64>>,
}

impl<const N: usize> LabeledCounter<N> {
    pub fn new(name: &'static str, label_names: [&'static str; N]) -> Self {
        Self {
            name,
            label_names,
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn label_names(&self) -> &[&'static str; N] {
        &self.label_names
    }

    pub fn inc(&self, labels: [&str; N]) {
        let key = labels.map(str::to_string);

        // Fast path: the series usually exists already.
        if let Some(value) = self.series.read().get(&key) {
            value.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.series
            .write()
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, labels: [&str; N]) -> u64 {
        let key = labels.map(str::to_string);
        self.series
            .read()
            .get(&key)
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// All series, sorted by label values.
    pub fn series(&self) -> Vec<([String; N], u64)> {
        let mut all: Vec<_> = self
            .series
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();
        all.sort();
        all
    }
}
