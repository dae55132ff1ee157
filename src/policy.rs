//! Fill policies and the occupancy bounds derived from them.
//!
//! A tree is configured with an order `m` (at most `m` children, `m - 1` keys per
//! node) and a [`FillPolicy`]. The two presets reproduce the classic B+ and B*
//! behaviours; any combination of the individual switches is accepted.
//!
//! ```
//! use arbor_index::{FillPolicy, MinFill, TreeConfig};
//!
//! let bounds = TreeConfig::new(7, FillPolicy::REDISTRIBUTE_FIRST).validate().unwrap();
//! assert_eq!(bounds.max_keys(), 6);
//! assert_eq!(bounds.leaf_floor(), 3);
//! assert_eq!(bounds.threshold(true), 4);
//!
//! let custom = FillPolicy { min_fill: MinFill::Half, ..FillPolicy::REDISTRIBUTE_FIRST };
//! assert_eq!(custom.kind(), None);
//! ```

use core::fmt;

use crate::error::{Error, Result};

/// Occupancy a non-root node is rebalanced towards after a removal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MinFill {
    /// Half capacity, the structural floor that a split guarantees.
    Half,
    /// `ceil(2 * max_keys / 3)` keys.
    TwoThirds,
}

/// Switches that distinguish the two rebalancing strategies.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FillPolicy {
    /// Rebalance threshold used on removal.
    pub min_fill: MinFill,
    /// On overflow, shift one entry to a sibling with spare room before splitting.
    pub redistribute_before_split: bool,
    /// On underflow, borrow from a sibling before merging. When off, a merge is
    /// preferred whenever the merged node fits, and borrowing is the fallback.
    pub redistribute_before_merge: bool,
    /// Release the root leaf once the last entry is removed, leaving the tree with
    /// no root at all until the next insert.
    pub release_empty_root: bool,
}

impl FillPolicy {
    /// B+-style: unconditional splits, borrow-then-merge, half fill. An emptied tree
    /// keeps an empty root leaf.
    pub const SPLIT_MERGE: Self = Self {
        min_fill: MinFill::Half,
        redistribute_before_split: false,
        redistribute_before_merge: true,
        release_empty_root: false,
    };

    /// B*-style: redistribute before splitting and before merging, two-thirds fill.
    /// An emptied tree has no root.
    pub const REDISTRIBUTE_FIRST: Self = Self {
        min_fill: MinFill::TwoThirds,
        redistribute_before_split: true,
        redistribute_before_merge: true,
        release_empty_root: true,
    };

    /// The preset this policy equals, if any.
    pub fn kind(&self) -> Option<PolicyKind> {
        if *self == Self::SPLIT_MERGE {
            Some(PolicyKind::SplitMerge)
        } else if *self == Self::REDISTRIBUTE_FIRST {
            Some(PolicyKind::RedistributeFirst)
        } else {
            None
        }
    }
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self::SPLIT_MERGE
    }
}

/// Named presets, for callers that select a policy by name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PolicyKind {
    SplitMerge,
    RedistributeFirst,
}

impl From<PolicyKind> for FillPolicy {
    fn from(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::SplitMerge => FillPolicy::SPLIT_MERGE,
            PolicyKind::RedistributeFirst => FillPolicy::REDISTRIBUTE_FIRST,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::SplitMerge => f.write_str("split/merge"),
            PolicyKind::RedistributeFirst => f.write_str("redistribute-first"),
        }
    }
}

/// Construction parameters for an [`IndexTree`](crate::IndexTree).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TreeConfig {
    /// Maximum children of an internal node.
    pub order: usize,
    pub policy: FillPolicy,
}

impl TreeConfig {
    /// Smallest order for which both halves of a split are non-empty.
    pub const MIN_ORDER: usize = 3;

    pub fn new(order: usize, policy: impl Into<FillPolicy>) -> Self {
        Self {
            order,
            policy: policy.into(),
        }
    }

    /// Checks the order and derives the node bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`] when `order < 3`.
    pub fn validate(&self) -> Result<FillBounds> {
        if self.order < Self::MIN_ORDER {
            return Err(Error::InvalidOrder {
                order: self.order,
                min: Self::MIN_ORDER,
            });
        }
        Ok(FillBounds::new(self.order, self.policy.min_fill))
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(4, FillPolicy::SPLIT_MERGE)
    }
}

/// Key-count limits for one order and fill policy.
///
/// The floors are what a split leaves in each half, so they hold for every non-root
/// node. The thresholds are the counts a removal rebalances towards; with
/// [`MinFill::Half`] they equal the floors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FillBounds {
    max_keys: usize,
    leaf_floor: usize,
    internal_floor: usize,
    leaf_threshold: usize,
    internal_threshold: usize,
}

impl FillBounds {
    fn new(order: usize, min_fill: MinFill) -> Self {
        let max_keys = order - 1;
        let leaf_floor = max_keys.div_ceil(2);
        // ceil(order / 2) children.
        let internal_floor = order.div_ceil(2) - 1;
        let (leaf_threshold, internal_threshold) = match min_fill {
            MinFill::Half => (leaf_floor, internal_floor),
            MinFill::TwoThirds => {
                let two_thirds = (2 * max_keys).div_ceil(3);
                (two_thirds.max(leaf_floor), two_thirds.max(internal_floor))
            }
        };
        Self {
            max_keys,
            leaf_floor,
            internal_floor,
            leaf_threshold,
            internal_threshold,
        }
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    pub fn leaf_floor(&self) -> usize {
        self.leaf_floor
    }

    pub fn internal_floor(&self) -> usize {
        self.internal_floor
    }

    /// Fewest keys a non-root node of the given kind may hold.
    pub fn floor(&self, is_leaf: bool) -> usize {
        if is_leaf { self.leaf_floor } else { self.internal_floor }
    }

    /// Below this many keys a non-root node is rebalanced after a removal.
    pub fn threshold(&self, is_leaf: bool) -> usize {
        if is_leaf { self.leaf_threshold } else { self.internal_threshold }
    }

    /// Whether a sibling holding `count` keys may give one away.
    pub fn can_lend(&self, is_leaf: bool, count: usize) -> bool {
        count > self.threshold(is_leaf)
    }

    /// Whether two siblings fit into one node. Internal merges also pull down the
    /// parent separator.
    pub fn fits_merged(&self, is_leaf: bool, left: usize, right: usize) -> bool {
        let merged = if is_leaf { left + right } else { left + right + 1 };
        merged <= self.max_keys
    }
}
