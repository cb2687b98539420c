//! Combining per-node cache statistics into cluster statistics.

use crate::cluster::statistics::{CacheStatistics, ClusterCacheStatistics, NodeInfo};

/// Statistics of a replicated cache.
///
/// Every node holds the same data, so item counts and limits come from the
/// local node; only hits and misses are summed.
pub fn combine_replicated_statistics(s: &ClusterCacheStatistics) -> CacheStatistics {
    let mut stats = CacheStatistics::new();

    for node in reporting(&s.nodes) {
        stats.hit_count += node.hit_count;
        stats.miss_count += node.miss_count;
    }

    let local = s.local_statistics();
    stats.update_count(local.count);
    stats.max_count = local.max_count;
    stats.max_size = local.max_size;
    stats
}

/// Statistics of a partitioned cache: counts and limits are summed.
pub fn combine_partition_statistics(s: &ClusterCacheStatistics) -> CacheStatistics {
    sum_partitions(s, |_| true)
}

/// Statistics of a partitioned cache with replicas.
///
/// Only coordinators and sub-coordinators own primary data, so replicas are
/// left out of the sums.
pub fn combine_partition_replicas_statistics(s: &ClusterCacheStatistics) -> CacheStatistics {
    sum_partitions(s, NodeInfo::is_coordinating)
}

fn reporting(nodes: &[NodeInfo]) -> impl Iterator<Item = &CacheStatistics> {
    nodes.iter().filter_map(|node| node.statistics.as_ref())
}

/// Sum statistics over the selected nodes. Any unbounded node makes the
/// whole cluster unbounded.
fn sum_partitions<F>(s: &ClusterCacheStatistics, include: F) -> CacheStatistics
where
    F: Fn(&NodeInfo) -> bool,
{
    let mut stats = CacheStatistics::new();
    let mut unbounded = false;

    for node in s.nodes.iter().filter(|node| include(node)) {
        let Some(node_stats) = node.statistics.as_ref() else {
            continue;
        };

        stats.hit_count += node_stats.hit_count;
        stats.miss_count += node_stats.miss_count;
        stats.update_count(stats.count + node_stats.count);
        stats.max_count += node_stats.max_count;
        if node_stats.max_count == 0 {
            unbounded = true;
        }
    }

    stats.max_size = s.local_statistics().max_size;
    if unbounded {
        stats.max_count = 0;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::statistics::node_status;

    fn node_stats(count: u64, max_count: u64, hits: u64, misses: u64) -> CacheStatistics {
        CacheStatistics {
            count,
            hi_count: count,
            max_count,
            max_size: 0,
            hit_count: hits,
            miss_count: misses,
        }
    }

    fn cluster(nodes: Vec<NodeInfo>) -> ClusterCacheStatistics {
        let mut local = node_stats(10, 100, 0, 0);
        local.max_size = 4096;
        ClusterCacheStatistics::new(NodeInfo::new(0).with_statistics(local)).with_nodes(nodes)
    }

    #[test]
    fn test_replicated_takes_counts_from_local() {
        let s = cluster(vec![
            NodeInfo::new(0).with_statistics(node_stats(10, 100, 5, 1)),
            NodeInfo::new(1).with_statistics(node_stats(9, 100, 3, 2)),
            NodeInfo::new(2),
        ]);

        let stats = combine_replicated_statistics(&s);
        assert_eq!(stats.hit_count, 8);
        assert_eq!(stats.miss_count, 3);
        assert_eq!(stats.count, 10);
        assert_eq!(stats.max_count, 100);
        assert_eq!(stats.max_size, 4096);
    }

    #[test]
    fn test_partition_sums_counts() {
        let s = cluster(vec![
            NodeInfo::new(0).with_statistics(node_stats(10, 100, 5, 1)),
            NodeInfo::new(1).with_statistics(node_stats(7, 50, 3, 2)),
        ]);

        let stats = combine_partition_statistics(&s);
        assert_eq!(stats.count, 17);
        assert_eq!(stats.hi_count, 17);
        assert_eq!(stats.max_count, 150);
        assert_eq!(stats.hit_count, 8);
        assert_eq!(stats.max_size, 4096);
    }

    #[test]
    fn test_partition_unbounded_node_zeroes_max_count() {
        let s = cluster(vec![
            NodeInfo::new(0).with_statistics(node_stats(10, 100, 0, 0)),
            NodeInfo::new(1).with_statistics(node_stats(7, 0, 0, 0)),
        ]);
        assert_eq!(combine_partition_statistics(&s).max_count, 0);
    }

    #[test]
    fn test_partition_replicas_skip_replicas() {
        let s = cluster(vec![
            NodeInfo::new(0)
                .with_status(node_status::COORDINATOR)
                .with_statistics(node_stats(10, 100, 1, 0)),
            NodeInfo::new(1)
                .with_status(node_status::RUNNING)
                .with_statistics(node_stats(10, 0, 1, 0)),
            NodeInfo::new(2)
                .with_status(node_status::SUB_COORDINATOR)
                .with_statistics(node_stats(5, 100, 1, 0)),
        ]);

        let stats = combine_partition_replicas_statistics(&s);
        assert_eq!(stats.count, 15);
        assert_eq!(stats.max_count, 200);
        assert_eq!(stats.hit_count, 2);
    }

    #[test]
    fn test_empty_cluster() {
        let s = cluster(Vec::new());
        let stats = combine_partition_statistics(&s);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.max_size, 4096);
    }
}
