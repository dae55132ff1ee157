use core::fmt;
use core::iter::FusedIterator;

use tracing::debug;

use crate::Key;
use crate::error::Result;
use crate::policy::{FillBounds, FillPolicy, TreeConfig};
use crate::raw::{Handle, RawTree};
use crate::stats::TreeStats;

/// An ordered index from `i64` keys to payloads, stored as a B+ tree.
///
/// Entries live only in the leaves, which form a doubly linked chain in key order.
/// How the tree rebalances is chosen at construction with a [`FillPolicy`]:
/// [`FillPolicy::SPLIT_MERGE`] splits every overflowing node and borrows or merges on
/// underflow, while [`FillPolicy::REDISTRIBUTE_FIRST`] first shifts entries to
/// siblings with spare room and keeps nodes at least two-thirds full on removal.
///
/// Inserting an existing key replaces its payload.
///
/// # Examples
///
/// ```
/// use arbor_index::{IndexTree, PolicyKind};
///
/// let mut index = IndexTree::new(4, PolicyKind::RedistributeFirst)?;
/// index.insert(42, "Widget, Tools".to_string());
/// index.insert(7, "Gadget, Toys".to_string());
///
/// assert_eq!(index.search(42).map(String::as_str), Some("Widget, Tools"));
/// assert!(index.remove(7));
/// assert!(!index.remove(7));
///
/// let keys: Vec<i64> = index.keys().collect();
/// assert_eq!(keys, [42]);
/// # Ok::<(), arbor_index::Error>(())
/// ```
pub struct IndexTree<V = String> {
    raw: RawTree<V>,
    config: TreeConfig,
}

impl<V> IndexTree<V> {
    /// Creates an empty tree of the given order (maximum children per internal node).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`](crate::Error::InvalidOrder) if `order < 3`.
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_index::{FillPolicy, IndexTree};
    ///
    /// let index: IndexTree = IndexTree::new(3, FillPolicy::SPLIT_MERGE).unwrap();
    /// assert_eq!(index.max_keys(), 2);
    /// assert!(IndexTree::<String>::new(2, FillPolicy::SPLIT_MERGE).is_err());
    /// ```
    pub fn new(order: usize, policy: impl Into<FillPolicy>) -> Result<Self> {
        Self::with_config(TreeConfig::new(order, policy))
    }

    /// Creates an empty tree from a bundled configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`](crate::Error::InvalidOrder) if `config.order < 3`.
    pub fn with_config(config: TreeConfig) -> Result<Self> {
        let bounds = config.validate()?;
        debug!(order = config.order, policy = ?config.policy, "created index tree");
        Ok(Self {
            raw: RawTree::new(bounds, config.policy),
            config,
        })
    }

    /// Inserts a key-value pair.
    ///
    /// Returns `None` for a new key. For an existing key the payload is replaced and
    /// the old one returned; the tree's shape does not change.
    pub fn insert(&mut self, key: Key, value: V) -> Option<V> {
        self.raw.insert(key, value)
    }

    /// Returns the payload stored under `key`.
    pub fn search(&self, key: Key) -> Option<&V> {
        self.raw.get(key)
    }

    /// Alias of [`search`](Self::search).
    pub fn get(&self, key: Key) -> Option<&V> {
        self.raw.get(key)
    }

    pub fn contains_key(&self, key: Key) -> bool {
        self.raw.get(key).is_some()
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn remove(&mut self, key: Key) -> bool {
        self.raw.remove(key).is_some()
    }

    /// Removes `key` and returns its payload.
    pub fn take(&mut self, key: Key) -> Option<V> {
        self.raw.remove(key)
    }

    /// Lazily yields the entries with `lo <= key <= hi` in ascending key order.
    ///
    /// Empty when `lo > hi`.
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_index::{IndexTree, PolicyKind};
    ///
    /// let mut index = IndexTree::new(3, PolicyKind::SplitMerge).unwrap();
    /// for key in [5, 10, 15, 20] {
    ///     index.insert(key, key * 100);
    /// }
    /// let hits: Vec<_> = index.range(6, 15).collect();
    /// assert_eq!(hits, [(10, &1000), (15, &1500)]);
    /// assert_eq!(index.range(15, 6).count(), 0);
    /// ```
    pub fn range(&self, lo: Key, hi: Key) -> Range<'_, V> {
        let start = if lo <= hi { self.raw.lower_bound(lo) } else { None };
        Range {
            tree: &self.raw,
            leaf: start.map(|(leaf, _)| leaf),
            index: start.map_or(0, |(_, index)| index),
            hi,
        }
    }

    /// Collects the payloads of keys in `[lo, hi]`, ascending.
    pub fn range_scan(&self, lo: Key, hi: Key) -> Vec<&V> {
        self.range(lo, hi).map(|(_, value)| value).collect()
    }

    /// Walks the leaf chain from head to tail.
    ///
    /// The returned iterator is double-ended and can be cloned to restart from the
    /// same position.
    pub fn in_order_dump(&self) -> Iter<'_, V> {
        Iter {
            tree: &self.raw,
            front_leaf: self.raw.first_leaf(),
            front_index: 0,
            back_leaf: self.raw.last_leaf(),
            back_index: self
                .raw
                .last_leaf()
                .map_or(0, |h| self.raw.node(h).key_count().saturating_sub(1)),
            remaining: self.raw.len(),
        }
    }

    /// Alias of [`in_order_dump`](Self::in_order_dump).
    pub fn iter(&self) -> Iter<'_, V> {
        self.in_order_dump()
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = Key> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    pub fn first_key_value(&self) -> Option<(Key, &V)> {
        self.iter().next()
    }

    pub fn last_key_value(&self) -> Option<(Key, &V)> {
        self.iter().next_back()
    }

    /// Collects every entry by descending through child links instead of the leaf
    /// chain. Matches [`in_order_dump`](Self::in_order_dump) on a consistent tree.
    pub fn in_order_recursive(&self) -> Vec<(Key, &V)> {
        let mut out = Vec::with_capacity(self.raw.len());
        if let Some(root) = self.raw.root() {
            self.raw.collect_in_order(root, &mut out);
        }
        out
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// `false` only for a [`release_empty_root`](FillPolicy::release_empty_root)
    /// tree whose last entry was removed.
    pub fn has_root(&self) -> bool {
        self.raw.root().is_some()
    }

    /// Levels from the root to the leaves, inclusive. Zero without a root.
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Number of allocated nodes, leaf and internal.
    pub fn node_count(&self) -> usize {
        self.raw.node_count()
    }

    pub fn order(&self) -> usize {
        self.config.order
    }

    pub fn max_keys(&self) -> usize {
        self.raw.bounds().max_keys()
    }

    pub fn policy(&self) -> FillPolicy {
        *self.raw.policy()
    }

    pub fn bounds(&self) -> FillBounds {
        *self.raw.bounds()
    }

    pub fn config(&self) -> TreeConfig {
        self.config
    }

    /// Structural change counters since construction or the last reset.
    pub fn stats(&self) -> TreeStats {
        self.raw.stats()
    }

    pub fn reset_stats(&mut self) {
        self.raw.reset_stats();
    }

    /// Removes every entry and frees every node, returning to the freshly constructed
    /// shape. Statistics are kept.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Validates every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`](crate::Error::Corrupted) listing each violation.
    pub fn check_invariants(&self) -> Result<()> {
        self.raw.check_invariants()
    }
}

impl<V: fmt::Debug> fmt::Debug for IndexTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a IndexTree<V> {
    type Item = (Key, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

/// An iterator over the entries of an [`IndexTree`], in key order.
///
/// Created by [`IndexTree::in_order_dump`] and [`IndexTree::iter`].
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, V> {
    tree: &'a RawTree<V>,
    front_leaf: Option<Handle>,
    front_index: usize,
    back_leaf: Option<Handle>,
    back_index: usize,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Key, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let leaf = self.tree.node(self.front_leaf?).as_leaf();
        let item = (leaf.key(self.front_index), leaf.value(self.front_index));

        self.remaining -= 1;
        self.front_index += 1;
        if self.front_index >= leaf.key_count() {
            self.front_leaf = leaf.next();
            self.front_index = 0;
        }

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let leaf = self.tree.node(self.back_leaf?).as_leaf();
        let item = (leaf.key(self.back_index), leaf.value(self.back_index));

        self.remaining -= 1;
        if self.back_index == 0 {
            self.back_leaf = leaf.prev();
            if let Some(prev) = self.back_leaf {
                self.back_index = self.tree.node(prev).key_count().saturating_sub(1);
            }
        } else {
            self.back_index -= 1;
        }

        Some(item)
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<V> FusedIterator for Iter<'_, V> {}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front_leaf: self.front_leaf,
            front_index: self.front_index,
            back_leaf: self.back_leaf,
            back_index: self.back_index,
            remaining: self.remaining,
        }
    }
}

impl<V> fmt::Debug for Iter<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("remaining", &self.remaining).finish()
    }
}

/// An iterator over the entries of an [`IndexTree`] with keys in a closed interval.
///
/// Created by [`IndexTree::range`]. Ends at the first key above the upper bound.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Range<'a, V> {
    tree: &'a RawTree<V>,
    leaf: Option<Handle>,
    index: usize,
    hi: Key,
}

impl<'a, V> Iterator for Range<'a, V> {
    type Item = (Key, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf = self.tree.node(self.leaf?).as_leaf();
            if self.index < leaf.key_count() {
                let key = leaf.key(self.index);
                if key > self.hi {
                    self.leaf = None;
                    return None;
                }
                let value = leaf.value(self.index);
                self.index += 1;
                return Some((key, value));
            }
            self.leaf = leaf.next();
            self.index = 0;
        }
    }
}

impl<V> FusedIterator for Range<'_, V> {}

impl<V> Clone for Range<'_, V> {
    fn clone(&self) -> Self {
        Range {
            tree: self.tree,
            leaf: self.leaf,
            index: self.index,
            hi: self.hi,
        }
    }
}

impl<V> fmt::Debug for Range<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Range").field("hi", &self.hi).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyKind;

    fn index(order: usize, kind: PolicyKind, keys: &[Key]) -> IndexTree {
        let mut index = IndexTree::new(order, kind).unwrap();
        for &key in keys {
            index.insert(key, format!("v{key}"));
        }
        index
    }

    #[test]
    fn iter_is_double_ended_and_exact() {
        let index = index(3, PolicyKind::SplitMerge, &[4, 2, 6, 1, 5, 3]);
        let mut iter = index.iter();
        assert_eq!(iter.len(), 6);
        assert_eq!(iter.next().map(|(k, _)| k), Some(1));
        assert_eq!(iter.next_back().map(|(k, _)| k), Some(6));
        let middle: Vec<Key> = iter.map(|(k, _)| k).collect();
        assert_eq!(middle, [2, 3, 4, 5]);
        assert_eq!(index.keys().rev().collect::<Vec<_>>(), [6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn iter_clone_restarts_from_same_position() {
        let index = index(3, PolicyKind::RedistributeFirst, &[1, 2, 3, 4, 5]);
        let mut iter = index.in_order_dump();
        iter.next();
        let replay = iter.clone();
        assert_eq!(iter.count(), 4);
        assert_eq!(replay.map(|(k, _)| k).collect::<Vec<_>>(), [2, 3, 4, 5]);
    }

    #[test]
    fn range_stops_past_upper_bound() {
        let index = index(4, PolicyKind::SplitMerge, &(0..50).map(|k| k * 2).collect::<Vec<_>>());
        let keys: Vec<Key> = index.range(9, 21).map(|(k, _)| k).collect();
        assert_eq!(keys, [10, 12, 14, 16, 18, 20]);
        assert_eq!(index.range(20, 20).count(), 1);
        assert_eq!(index.range(21, 21).count(), 0);
        assert_eq!(index.range(99, 200).count(), 0);
        assert_eq!(index.range(-10, 0).map(|(k, _)| k).collect::<Vec<_>>(), [0]);
    }

    #[test]
    fn empty_tree_views() {
        let mut index = index(3, PolicyKind::RedistributeFirst, &[]);
        assert!(index.is_empty());
        assert!(index.has_root());
        assert_eq!(index.iter().next(), None);
        assert_eq!(index.first_key_value(), None);

        index.insert(1, "one".into());
        assert!(index.remove(1));
        assert!(!index.has_root());
        assert_eq!(index.height(), 0);
        assert_eq!(index.iter().next_back(), None);
        assert!(index.range_scan(i64::MIN, i64::MAX).is_empty());
        assert!(index.in_order_recursive().is_empty());
    }

    #[test]
    fn clear_restores_constructed_shape() {
        for kind in [PolicyKind::SplitMerge, PolicyKind::RedistributeFirst] {
            let mut index = index(3, kind, &(0..40).collect::<Vec<_>>());
            index.clear();
            assert!(index.is_empty());
            assert!(index.has_root());
            assert_eq!(index.node_count(), 1);
            index.check_invariants().unwrap();
            index.insert(5, "five".into());
            assert_eq!(index.len(), 1);
        }
    }

    #[test]
    fn debug_lists_entries() {
        let index = index(3, PolicyKind::SplitMerge, &[2, 1]);
        assert_eq!(format!("{index:?}"), r#"{1: "v1", 2: "v2"}"#);
    }
}
