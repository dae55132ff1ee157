use tracing::debug;

use super::handle::Handle;
use super::node::Node;
use super::tree::RawTree;

/// How one round of underflow repair ended.
enum Repair {
    /// A sibling lent an entry; ancestors are untouched.
    Borrowed,
    /// Two siblings became one; the parent lost a separator and may underflow.
    Merged,
    /// Neither applied.
    Unchanged,
}

impl<V> RawTree<V> {
    /// Restores the fill bounds of `node` and its ancestors after a removal.
    ///
    /// A node at or above the rebalance threshold, or the root, ends the repair.
    /// Otherwise the node borrows from or merges with an adjacent sibling, in the
    /// order the policy prefers. Only a merge continues upward. When neither is
    /// possible and the node sits below its structural floor, entries are rotated in
    /// from a sibling until it reaches the floor.
    pub(super) fn resolve_underflow(&mut self, mut node: Handle) {
        loop {
            let Some((parent, index)) = self.parent_slot(node) else {
                self.settle_root(node);
                return;
            };

            let (is_leaf, count) = {
                let n = self.nodes.get(node);
                (n.is_leaf(), n.key_count())
            };
            if count >= self.bounds.threshold(is_leaf) {
                return;
            }

            let repair = if self.policy.redistribute_before_merge {
                self.borrow_from_sibling(parent, index)
                    .or_else(|| self.merge_with_sibling(parent, index))
            } else {
                self.merge_with_sibling(parent, index)
                    .or_else(|| self.borrow_from_sibling(parent, index))
            };

            match repair {
                Repair::Merged => node = parent,
                Repair::Borrowed => return,
                Repair::Unchanged => {
                    if count < self.bounds.floor(is_leaf) {
                        self.equalize(parent, index);
                    }
                    return;
                }
            }
        }
    }

    /// Takes one entry from a sibling holding more than the rebalance threshold,
    /// left sibling first.
    fn borrow_from_sibling(&mut self, parent: Handle, index: usize) -> Repair {
        let (is_leaf, left, right) = self.siblings(parent, index);

        let lender = |sibling: Option<Handle>| {
            sibling.filter(|&h| self.bounds.can_lend(is_leaf, self.nodes.get(h).key_count()))
        };
        let (left, right) = (lender(left), lender(right));

        if let Some(left) = left {
            self.rotate_right(parent, index - 1);
            self.stats.borrows += 1;
            let separator = self.nodes.get(parent).keys()[index - 1];
            debug!(from = ?left, separator, "borrowed from left");
            return Repair::Borrowed;
        }
        if let Some(right) = right {
            self.rotate_left(parent, index);
            self.stats.borrows += 1;
            let separator = self.nodes.get(parent).keys()[index];
            debug!(from = ?right, separator, "borrowed from right");
            return Repair::Borrowed;
        }
        Repair::Unchanged
    }

    /// Folds the child at `index` together with an adjacent sibling when the result
    /// fits in one node, preferring the left sibling.
    fn merge_with_sibling(&mut self, parent: Handle, index: usize) -> Repair {
        let (is_leaf, left, right) = self.siblings(parent, index);
        let count = self.nodes.get(self.nodes.get(parent).as_internal().child(index)).key_count();

        let count_of = |sibling: Option<Handle>| sibling.map(|h| self.nodes.get(h).key_count());
        let (left_count, right_count) = (count_of(left), count_of(right));

        if left_count.is_some_and(|left| self.bounds.fits_merged(is_leaf, left, count)) {
            self.merge_children(parent, index - 1);
            return Repair::Merged;
        }
        if right_count.is_some_and(|right| self.bounds.fits_merged(is_leaf, count, right)) {
            self.merge_children(parent, index);
            return Repair::Merged;
        }
        Repair::Unchanged
    }

    /// Rotates entries into the child at `index` until it reaches its floor. Used when
    /// no sibling may lend under the rebalance threshold and a merge would overflow,
    /// which guarantees the sibling keeps its own floor.
    fn equalize(&mut self, parent: Handle, index: usize) {
        let node = self.nodes.get(parent).as_internal().child(index);
        let floor = self.bounds.floor(self.nodes.get(node).is_leaf());

        while self.nodes.get(node).key_count() < floor {
            if index > 0 {
                self.rotate_right(parent, index - 1);
            } else {
                self.rotate_left(parent, index);
            }
            self.stats.borrows += 1;
        }
        debug!(node = ?node, floor, "equalized with sibling");
    }

    /// Absorbs child `index + 1` of `parent` into child `index` and frees it.
    fn merge_children(&mut self, parent: Handle, index: usize) {
        let (separator, right) = self.nodes.get_mut(parent).as_internal_mut().remove_child(index);
        let left = self.nodes.get(parent).as_internal().child(index);

        match self.nodes.take(right) {
            Node::Leaf(right_leaf) => {
                let next = right_leaf.next();
                self.nodes.get_mut(left).as_leaf_mut().absorb(right_leaf);
                match next {
                    Some(next) => self.nodes.get_mut(next).as_leaf_mut().set_prev(Some(left)),
                    None => self.last_leaf = Some(left),
                }
            }
            Node::Internal(right_internal) => {
                self.nodes.get_mut(left).as_internal_mut().absorb(separator, right_internal);
                self.adopt_children(left);
            }
        }

        self.stats.merges += 1;
        debug!(into = ?left, freed = ?right, separator, "merged siblings");
    }

    /// Shrinks or releases a root left sparse by a removal.
    fn settle_root(&mut self, root: Handle) {
        match self.nodes.get(root) {
            Node::Internal(internal) if internal.key_count() == 0 => {
                let child = internal.child(0);
                self.nodes.take(root);
                self.nodes.get_mut(child).set_parent(None);
                self.root = Some(child);
                self.stats.root_collapses += 1;
                debug!(old = ?root, new = ?child, "collapsed root");
            }
            Node::Leaf(leaf) if leaf.key_count() == 0 && self.policy.release_empty_root => {
                self.nodes.take(root);
                self.root = None;
                self.first_leaf = None;
                self.last_leaf = None;
                debug!("released empty root");
            }
            _ => {}
        }
    }

    /// Whether the child at `index` is a leaf, and its left and right siblings.
    fn siblings(&self, parent: Handle, index: usize) -> (bool, Option<Handle>, Option<Handle>) {
        let p = self.nodes.get(parent).as_internal();
        let is_leaf = self.nodes.get(p.child(index)).is_leaf();
        let left = index.checked_sub(1).map(|i| p.child(i));
        let right = (index + 1 < p.child_count()).then(|| p.child(index + 1));
        (is_leaf, left, right)
    }
}

impl Repair {
    fn or_else(self, f: impl FnOnce() -> Repair) -> Repair {
        match self {
            Repair::Unchanged => f(),
            done => done,
        }
    }
}
