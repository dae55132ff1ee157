//! Timed bulk operations against an [`IndexTree`].
//!
//! Key sampling is seeded so a batch can be replayed exactly.
//!
//! ```
//! use arbor_index::workload::{bulk_insert, remove_sample, sample_keys, seeded_rng};
//! use arbor_index::{IndexTree, PolicyKind};
//!
//! let mut index = IndexTree::new(3, PolicyKind::RedistributeFirst).unwrap();
//! let inserted = bulk_insert(&mut index, (1..=100).map(|id| (id, format!("item {id}"))));
//! assert_eq!(inserted.inserted, 100);
//!
//! let keys = sample_keys(&mut seeded_rng(7), 10..=20, 3);
//! let removed = remove_sample(&mut index, &keys);
//! assert_eq!(removed.outcomes.len(), 3);
//! ```

use std::fmt;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::{IndexTree, Key};

/// Timing and counts for a bulk insert.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InsertReport {
    /// Keys that were new to the tree.
    pub inserted: usize,
    /// Keys that already existed and had their payload replaced.
    pub replaced: usize,
    pub elapsed: Duration,
}

/// What happened to one key of a removal batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RemovalOutcome<V> {
    Removed { key: Key, payload: V },
    NotFound { key: Key },
}

impl<V> RemovalOutcome<V> {
    pub fn key(&self) -> Key {
        match self {
            RemovalOutcome::Removed { key, .. } | RemovalOutcome::NotFound { key } => *key,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, RemovalOutcome::Removed { .. })
    }
}

impl<V: fmt::Display> fmt::Display for RemovalOutcome<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalOutcome::Removed { key, payload } => write!(f, "id {key}: removed {payload}"),
            RemovalOutcome::NotFound { key } => write!(f, "id {key}: not found"),
        }
    }
}

/// Per-key outcomes and timing for a removal batch.
#[derive(Clone, Debug)]
pub struct RemovalReport<V> {
    pub outcomes: Vec<RemovalOutcome<V>>,
    pub elapsed: Duration,
}

impl<V> RemovalReport<V> {
    pub fn removed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_removed()).count()
    }

    /// Keys that were present and are now gone.
    pub fn removed_keys(&self) -> Vec<Key> {
        self.outcomes.iter().filter(|o| o.is_removed()).map(RemovalOutcome::key).collect()
    }
}

/// Inserts every entry, timing the whole batch.
pub fn bulk_insert<V>(
    tree: &mut IndexTree<V>,
    entries: impl IntoIterator<Item = (Key, V)>,
) -> InsertReport {
    let mut inserted = 0;
    let mut replaced = 0;

    let start = Instant::now();
    for (key, value) in entries {
        match tree.insert(key, value) {
            None => inserted += 1,
            Some(_) => replaced += 1,
        }
    }
    let elapsed = start.elapsed();

    info!(
        inserted,
        replaced,
        ?elapsed,
        policy = ?tree.policy().kind(),
        "bulk insert finished"
    );
    InsertReport {
        inserted,
        replaced,
        elapsed,
    }
}

/// Removes each key in turn, recording whether it was present. Repeated keys report
/// `NotFound` after their first removal.
pub fn remove_sample<V>(tree: &mut IndexTree<V>, keys: &[Key]) -> RemovalReport<V> {
    let start = Instant::now();
    let outcomes: Vec<_> = keys
        .iter()
        .map(|&key| match tree.take(key) {
            Some(payload) => RemovalOutcome::Removed { key, payload },
            None => RemovalOutcome::NotFound { key },
        })
        .collect();
    let elapsed = start.elapsed();

    let report = RemovalReport { outcomes, elapsed };
    info!(
        requested = keys.len(),
        removed = report.removed_count(),
        ?elapsed,
        "removal batch finished"
    );
    report
}

/// Draws `count` keys uniformly from `range`, with replacement.
pub fn sample_keys(rng: &mut impl Rng, range: RangeInclusive<Key>, count: usize) -> Vec<Key> {
    if range.is_empty() {
        return Vec::new();
    }
    (0..count).map(|_| rng.gen_range(range.clone())).collect()
}

/// Draws `count` distinct keys from `range`. Returns fewer when the range is smaller.
pub fn sample_distinct_keys(
    rng: &mut impl Rng,
    range: RangeInclusive<Key>,
    count: usize,
) -> Vec<Key> {
    let (start, end) = range.into_inner();
    let span = (i128::from(end) - i128::from(start) + 1).max(0);
    let span = usize::try_from(span).unwrap_or(usize::MAX);

    index::sample(rng, span, count.min(span))
        .into_iter()
        .map(|offset| start.wrapping_add_unsigned(offset as u64))
        .collect()
}

/// A reproducible generator for [`sample_keys`].
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyKind;

    fn index(keys: impl IntoIterator<Item = Key>) -> IndexTree {
        let mut index = IndexTree::new(4, PolicyKind::SplitMerge).unwrap();
        bulk_insert(&mut index, keys.into_iter().map(|k| (k, k.to_string())));
        index
    }

    #[test]
    fn bulk_insert_counts_replacements() {
        let mut index = index(1..=10);
        let report = bulk_insert(&mut index, [(5, "five".to_string()), (11, "eleven".to_string())]);
        assert_eq!((report.inserted, report.replaced), (1, 1));
        assert_eq!(index.search(5).map(String::as_str), Some("five"));
    }

    #[test]
    fn remove_sample_reports_each_key() {
        let mut index = index(1..=10);
        let report = remove_sample(&mut index, &[3, 42, 3]);
        assert_eq!(
            report.outcomes,
            vec![
                RemovalOutcome::Removed { key: 3, payload: "3".to_string() },
                RemovalOutcome::NotFound { key: 42 },
                RemovalOutcome::NotFound { key: 3 },
            ]
        );
        assert_eq!(report.removed_keys(), [3]);
        assert_eq!(report.outcomes[0].to_string(), "id 3: removed 3");
        assert_eq!(index.len(), 9);
    }

    #[test]
    fn sampling_is_reproducible_and_in_range() {
        let first = sample_keys(&mut seeded_rng(99), 1000..=2000, 50);
        let second = sample_keys(&mut seeded_rng(99), 1000..=2000, 50);
        assert_eq!(first, second);
        assert!(first.iter().all(|k| (1000..=2000).contains(k)));
        #[allow(clippy::reversed_empty_ranges)]
        let empty = sample_keys(&mut seeded_rng(1), 5..=4, 3);
        assert!(empty.is_empty());
    }

    #[test]
    fn distinct_sampling_caps_at_range_size() {
        let mut keys = sample_distinct_keys(&mut seeded_rng(3), 1..=5, 10);
        keys.sort_unstable();
        assert_eq!(keys, [1, 2, 3, 4, 5]);

        let keys = sample_distinct_keys(&mut seeded_rng(3), 1000..=2000, 10);
        assert_eq!(keys.len(), 10);
        assert!(keys.iter().all(|k| (1000..=2000).contains(k)));

        let mut whole = sample_distinct_keys(&mut seeded_rng(5), -500..=499, 1_000);
        whole.sort_unstable();
        assert_eq!(whole, (-500..=499).collect::<Vec<_>>());

        #[allow(clippy::reversed_empty_ranges)]
        let empty = sample_distinct_keys(&mut seeded_rng(5), 5..=4, 3);
        assert!(empty.is_empty());

        let extreme = sample_distinct_keys(&mut seeded_rng(8), i64::MIN..=i64::MAX, 4);
        assert_eq!(extreme.len(), 4);
    }
}
