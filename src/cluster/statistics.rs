//! Cache statistics of single nodes and of the cluster.

use crate::types::{BitSet, NodeId};
use serde::{Deserialize, Serialize};

/// Status bits of a cluster member.
pub mod node_status {
    pub const COORDINATOR: u8 = 0x01;
    pub const SUB_COORDINATOR: u8 = 0x02;
    pub const RUNNING: u8 = 0x04;
}

/// Statistics of one cache instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// Current item count.
    pub count: u64,
    /// Highest item count seen.
    pub hi_count: u64,
    /// Maximum item count; zero means unbounded.
    pub max_count: u64,
    /// Maximum size in bytes.
    pub max_size: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count and raise the hi-count if needed.
    pub fn update_count(&mut self, count: u64) {
        self.count = count;
        if self.count > self.hi_count {
            self.hi_count = self.count;
        }
    }

    /// Serialize statistics to bytes.
    pub fn to_bytes(&self) -> crate::error::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize statistics from bytes.
    pub fn from_bytes(data: &[u8]) -> crate::error::Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

/// A cluster member and its last reported statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub address: NodeId,
    pub subgroup_name: Option<String>,
    pub statistics: Option<CacheStatistics>,
    pub status: BitSet,
}

impl NodeInfo {
    pub fn new(address: NodeId) -> Self {
        Self {
            address,
            subgroup_name: None,
            statistics: None,
            status: BitSet::new(),
        }
    }

    pub fn with_statistics(mut self, statistics: CacheStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn with_status(mut self, bits: u8) -> Self {
        self.status.set_bit(bits);
        self
    }

    pub fn with_subgroup(mut self, name: impl Into<String>) -> Self {
        self.subgroup_name = Some(name.into());
        self
    }

    /// Coordinators and sub-coordinators own the primary copy of a partition.
    pub fn is_coordinating(&self) -> bool {
        self.status
            .is_any_bit_set(node_status::COORDINATOR | node_status::SUB_COORDINATOR)
    }
}

/// Statistics collected from every member of a clustered cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCacheStatistics {
    pub local_node: NodeInfo,
    pub nodes: Vec<NodeInfo>,
}

impl ClusterCacheStatistics {
    pub fn new(local_node: NodeInfo) -> Self {
        Self {
            local_node,
            nodes: Vec::new(),
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<NodeInfo>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn cluster_size(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn local_statistics(&self) -> CacheStatistics {
        self.local_node.statistics.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_count_tracks_high_water_mark() {
        let mut stats = CacheStatistics::new();
        stats.update_count(10);
        stats.update_count(4);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.hi_count, 10);
    }

    #[test]
    fn test_coordinating_status() {
        assert!(NodeInfo::new(1)
            .with_status(node_status::COORDINATOR)
            .is_coordinating());
        assert!(NodeInfo::new(2)
            .with_status(node_status::SUB_COORDINATOR | node_status::RUNNING)
            .is_coordinating());
        assert!(!NodeInfo::new(3)
            .with_status(node_status::RUNNING)
            .is_coordinating());
    }

    #[test]
    fn test_statistics_wire_format() {
        let mut stats = CacheStatistics::new();
        stats.update_count(3);
        stats.hit_count = 9;
        let decoded = CacheStatistics::from_bytes(&stats.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, stats);
    }
}
