//! Quota enforcement for the backlog
//!
//! The backlog is bounded by a count of files. When a listing holds more
//! files than the quota allows, the oldest ones are evicted first so that
//! the newest events survive a long outage.

/// Outcome of applying the quota to an oldest-first listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPartition<T> {
    /// Oldest entries over the quota, to be deleted without sending
    pub evict: Vec<T>,
    /// Entries that fit within the quota, still oldest first
    pub remaining: Vec<T>,
}

/// What one drain cycle should do with a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainPlan<T> {
    /// Entries to delete unsent because the backlog is over quota
    pub evict: Vec<T>,
    /// The oldest surviving entries, at most one batch
    pub send: Vec<T>,
}

impl<T> DrainPlan<T> {
    /// Whether the plan does nothing at all
    pub fn is_empty(&self) -> bool {
        self.evict.is_empty() && self.send.is_empty()
    }
}

/// Caps the number of event files kept on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaEvictor {
    /// Maximum number of event files to keep
    quota: usize,
}

impl Default for QuotaEvictor {
    fn default() -> Self {
        Self { quota: 500 }
    }
}

impl QuotaEvictor {
    /// Create an evictor keeping at most `quota` files
    pub fn new(quota: usize) -> Self {
        Self { quota }
    }

    /// Get the quota
    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Number of files over the quota for a backlog of `count` files
    pub fn excess(&self, count: usize) -> usize {
        count.saturating_sub(self.quota)
    }

    /// Split an oldest-first listing into the entries to evict and the rest
    pub fn partition<T>(&self, mut oldest_first: Vec<T>) -> QuotaPartition<T> {
        let excess = self.excess(oldest_first.len());
        let remaining = oldest_first.split_off(excess);
        QuotaPartition {
            evict: oldest_first,
            remaining,
        }
    }

    /// Apply the quota, then keep at most `batch_size` of the survivors
    ///
    /// Both halves come from the same listing: the evicted entries are the
    /// oldest overall, the batch is the oldest of what is left.
    pub fn plan<T>(&self, oldest_first: Vec<T>, batch_size: usize) -> DrainPlan<T> {
        let QuotaPartition { evict, mut remaining } = self.partition(oldest_first);
        remaining.truncate(batch_size);
        DrainPlan {
            evict,
            send: remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excess() {
        let evictor = QuotaEvictor::new(3);
        assert_eq!(evictor.excess(0), 0);
        assert_eq!(evictor.excess(3), 0);
        assert_eq!(evictor.excess(5), 2);
    }

    #[test]
    fn test_default_quota() {
        assert_eq!(QuotaEvictor::default().quota(), 500);
    }

    #[test]
    fn test_partition_evicts_oldest() {
        let evictor = QuotaEvictor::new(3);
        let partition = evictor.partition(vec!["f1", "f2", "f3", "f4", "f5"]);

        assert_eq!(partition.evict, vec!["f1", "f2"]);
        assert_eq!(partition.remaining, vec!["f3", "f4", "f5"]);
    }

    #[test]
    fn test_partition_under_quota_keeps_everything() {
        let evictor = QuotaEvictor::new(10);
        let partition = evictor.partition(vec![1, 2, 3]);

        assert!(partition.evict.is_empty());
        assert_eq!(partition.remaining, vec![1, 2, 3]);
    }

    #[test]
    fn test_plan_without_batch_only_evicts() {
        let evictor = QuotaEvictor::new(3);
        let plan = evictor.plan(vec!["f1", "f2", "f3", "f4", "f5"], 0);

        assert_eq!(plan.evict, vec!["f1", "f2"]);
        assert!(plan.send.is_empty());
    }

    #[test]
    fn test_plan_takes_oldest_batch() {
        let evictor = QuotaEvictor::new(500);
        let plan = evictor.plan(vec!["a", "b", "c", "d", "e"], 3);

        assert!(plan.evict.is_empty());
        assert_eq!(plan.send, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_plan_batch_from_survivors() {
        let evictor = QuotaEvictor::new(4);
        let plan = evictor.plan((1..=10).collect::<Vec<_>>(), 2);

        assert_eq!(plan.evict, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(plan.send, vec![7, 8]);
    }

    #[test]
    fn test_plan_empty_listing() {
        let plan = QuotaEvictor::new(1).plan(Vec::<u8>::new(), 50);
        assert!(plan.is_empty());
    }
}
