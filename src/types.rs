//! Core types used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Node identifier in the cluster.
pub type NodeId = u64;

/// Identifier of a lock holder.
pub type LockId = String;

/// Compact set of flag bits carried with cache operations and node status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitSet {
    data: u8,
}

impl BitSet {
    /// Create an empty bit set.
    pub const fn new() -> Self {
        Self { data: 0 }
    }

    /// Create a bit set from raw bits.
    pub const fn from_bits(data: u8) -> Self {
        Self { data }
    }

    /// Raw bits.
    pub fn bits(&self) -> u8 {
        self.data
    }

    /// Set the given bits.
    pub fn set_bit(&mut self, bits: u8) {
        self.data |= bits;
    }

    /// Clear the given bits.
    pub fn unset_bit(&mut self, bits: u8) {
        self.data &= !bits;
    }

    /// True if all of the given bits are set.
    pub fn is_bit_set(&self, bits: u8) -> bool {
        self.data & bits == bits
    }

    /// True if any of the given bits is set.
    pub fn is_any_bit_set(&self, bits: u8) -> bool {
        self.data & bits != 0
    }

    /// Builder-style variant of [`BitSet::set_bit`].
    pub fn with_bit(mut self, bits: u8) -> Self {
        self.set_bit(bits);
        self
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
