//! Occupancy statistics for a buddy tree.

use serde::Serialize;

use crate::alloc::BuddyTree;

/// A point-in-time occupancy snapshot of a [`BuddyTree`].
///
/// Computed from one pass over the leaf regions; serializable so
/// diagnostics can be exported as JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Total pool capacity in bytes.
    pub capacity: usize,
    /// Bytes covered by allocated regions.
    pub allocated_bytes: usize,
    /// Bytes covered by free regions.
    pub free_bytes: usize,
    /// Number of currently-allocated regions.
    pub allocated_regions: usize,
    /// Number of free leaf regions.
    pub free_regions: usize,
    /// Size of the largest free region, the biggest request that can
    /// currently succeed.
    pub largest_free: usize,
}

impl PoolStats {
    /// Collects statistics from `tree`.
    pub fn collect(tree: &BuddyTree) -> Self {
        let mut stats = Self {
            capacity: tree.capacity(),
            ..Self::default()
        };
        for leaf in tree.leaves() {
            if leaf.allocated {
                stats.allocated_bytes += leaf.size;
                stats.allocated_regions += 1;
            } else {
                stats.free_bytes += leaf.size;
                stats.free_regions += 1;
                stats.largest_free = stats.largest_free.max(leaf.size);
            }
        }
        stats
    }
}
