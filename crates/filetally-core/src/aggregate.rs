//! Concurrency-safe counters for accepted files.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use compact_str::CompactString;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Shared counter store fed by every walker thread.
///
/// The total is a single atomic. Group counts live in a sharded map whose
/// per-key increment holds the shard lock for the whole read-modify-write,
/// so concurrent increments of one key are never lost.
#[derive(Debug, Default)]
pub struct Aggregator {
    total: AtomicU64,
    unclassified: AtomicU64,
    groups: DashMap<CompactString, u64>,
}

impl Aggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the total and return the post-increment value.
    ///
    /// Every caller observes a distinct value.
    pub fn increment_total(&self) -> u64 {
        self.total.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Increment the count for `key`, starting it at 1 if absent.
    pub fn increment_group(&self, key: &str) {
        // Lookup first so the common case does not allocate a key.
        if let Some(mut count) = self.groups.get_mut(key) {
            *count += 1;
            return;
        }
        *self.groups.entry(CompactString::new(key)).or_insert(0) += 1;
    }

    /// Record a file that could not be classified into a group.
    pub fn record_unclassified(&self) {
        self.unclassified.fetch_add(1, Ordering::Relaxed);
    }

    /// Current total.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Number of distinct group keys.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Copy the current state, with groups sorted by key.
    ///
    /// Only consistent once all producers have finished.
    pub fn snapshot(&self) -> AggregateState {
        let group_counts = self
            .groups
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        AggregateState {
            total_count: self.total(),
            group_counts,
            unclassified: self.unclassified.load(Ordering::Acquire),
        }
    }
}

/// Frozen result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateState {
    /// Number of accepted files.
    pub total_count: u64,
    /// Accepted files per group key, ordered by key.
    pub group_counts: BTreeMap<CompactString, u64>,
    /// Accepted files that could not be placed in a group.
    pub unclassified: u64,
}

impl AggregateState {
    /// Sum over all groups.
    pub fn grouped_total(&self) -> u64 {
        self.group_counts.values().sum()
    }

    /// Count for a single group.
    pub fn group(&self, key: &str) -> Option<u64> {
        self.group_counts.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_increment_total_returns_post_value() {
        let agg = Aggregator::new();
        assert_eq!(agg.increment_total(), 1);
        assert_eq!(agg.increment_total(), 2);
        assert_eq!(agg.total(), 2);
    }

    #[test]
    fn test_increment_group_initializes_and_counts() {
        let agg = Aggregator::new();
        agg.increment_group("a");
        agg.increment_group("a");
        agg.increment_group("b");

        let state = agg.snapshot();
        assert_eq!(state.group("a"), Some(2));
        assert_eq!(state.group("b"), Some(1));
        assert_eq!(state.group("c"), None);
        assert_eq!(agg.group_count(), 2);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let agg = Aggregator::new();
        for key in ["zeta", "alpha", "mid"] {
            agg.increment_group(key);
        }
        let keys: Vec<_> = agg
            .snapshot()
            .group_counts
            .keys()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_concurrent_totals_are_distinct() {
        let agg = Arc::new(Aggregator::new());
        let threads = 8;
        let per_thread = 5_000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| agg.increment_total())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate total {value}");
            }
        }

        let expected = (threads * per_thread) as u64;
        assert_eq!(agg.total(), expected);
        assert_eq!(seen.len() as u64, expected);
        assert!(seen.iter().all(|v| (1..=expected).contains(v)));
    }

    #[test]
    fn test_concurrent_same_key_loses_nothing() {
        let agg = Aggregator::new();
        let threads = 8;
        let per_thread = 10_000;

        thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    for _ in 0..per_thread {
                        agg.increment_group("hot");
                    }
                });
            }
        });

        assert_eq!(agg.snapshot().group("hot"), Some((threads * per_thread) as u64));
    }

    #[test]
    fn test_concurrent_mixed_keys_sum_to_total() {
        let agg = Aggregator::new();

        thread::scope(|s| {
            for t in 0..4 {
                let agg = &agg;
                s.spawn(move || {
                    for i in 0..2_000 {
                        agg.increment_total();
                        agg.increment_group(&format!("k{}", (i + t) % 7));
                    }
                });
            }
        });

        let state = agg.snapshot();
        assert_eq!(state.total_count, 8_000);
        assert_eq!(state.grouped_total(), state.total_count);
        assert_eq!(state.group_counts.len(), 7);
    }
}
