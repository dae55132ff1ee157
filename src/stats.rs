//! Structural change counters.

use std::fmt;

/// Counts of the structural changes a tree has gone through since construction or
/// the last [`reset_stats`](crate::IndexTree::reset_stats).
///
/// # Example
/// ```
/// use arbor_index::{IndexTree, PolicyKind};
///
/// let mut tree = IndexTree::new(3, PolicyKind::SplitMerge).unwrap();
/// for key in [10, 20, 5] {
///     tree.insert(key, key.to_string());
/// }
/// let stats = tree.stats();
/// assert_eq!(stats.leaf_splits, 1);
/// assert_eq!(stats.root_splits, 1);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TreeStats {
    /// Overflowing leaves divided in two.
    pub leaf_splits: u64,
    /// Overflowing internal nodes divided in two.
    pub internal_splits: u64,
    /// Splits that had no parent and grew the tree by one level.
    pub root_splits: u64,
    /// Entries shifted to a sibling to absorb an overflow instead of splitting.
    pub redistributions: u64,
    /// Entries borrowed from a sibling to repair an underflow.
    pub borrows: u64,
    /// Sibling pairs combined into one node.
    pub merges: u64,
    /// Keyless internal roots replaced by their only child.
    pub root_collapses: u64,
}

impl TreeStats {
    /// All splits, leaf and internal.
    pub fn splits(&self) -> u64 {
        self.leaf_splits + self.internal_splits
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ splits: {} ({} leaf, {} internal, {} root), ",
            self.splits(),
            self.leaf_splits,
            self.internal_splits,
            self.root_splits,
        )?;
        write!(
            f,
            "redistributions: {}, borrows: {}, merges: {}, collapses: {} }}",
            self.redistributions, self.borrows, self.merges, self.root_collapses
        )
    }
}
