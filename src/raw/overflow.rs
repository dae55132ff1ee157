use tracing::debug;

use super::handle::Handle;
use super::node::{InternalNode, Node};
use super::tree::RawTree;
use crate::Key;

impl<V> RawTree<V> {
    /// Brings `node` and its ancestors back within `max_keys` after an insert.
    ///
    /// Each round either hands one entry to a sibling (when the policy allows it and
    /// a sibling has room), which ends the repair, or splits the node and inserts the
    /// promoted separator into the parent, which may overflow in turn. A node without
    /// a parent always splits and grows the tree by one level.
    pub(super) fn resolve_overflow(&mut self, mut node: Handle) {
        let max_keys = self.bounds.max_keys();
        while self.nodes.get(node).key_count() > max_keys {
            let Some((parent, index)) = self.parent_slot(node) else {
                self.split_root(node);
                return;
            };

            if self.policy.redistribute_before_split && self.donate_to_sibling(parent, index) {
                return;
            }

            let (promoted, right) = self.split_node(node);
            self.nodes.get_mut(parent).as_internal_mut().insert_child_at(index, promoted, right);
            node = parent;
        }
    }

    /// Moves one boundary entry of the overflowing child at `index` to an adjacent
    /// sibling with spare room, left sibling first.
    fn donate_to_sibling(&mut self, parent: Handle, index: usize) -> bool {
        let max_keys = self.bounds.max_keys();
        let (left, right) = {
            let p = self.nodes.get(parent).as_internal();
            let left = index.checked_sub(1).map(|i| p.child(i));
            let right = (index + 1 < p.child_count()).then(|| p.child(index + 1));
            (left, right)
        };

        let with_room = |sibling: Option<Handle>| {
            sibling.filter(|&h| self.nodes.get(h).key_count() < max_keys)
        };
        let (left, right) = (with_room(left), with_room(right));

        if let Some(left) = left {
            self.rotate_left(parent, index - 1);
            self.stats.redistributions += 1;
            let separator = self.nodes.get(parent).keys()[index - 1];
            debug!(to = ?left, separator, "redistributed left");
            return true;
        }

        if let Some(right) = right {
            self.rotate_right(parent, index);
            self.stats.redistributions += 1;
            let separator = self.nodes.get(parent).keys()[index];
            debug!(to = ?right, separator, "redistributed right");
            return true;
        }

        false
    }

    /// Splits the root and places a new internal root above both halves.
    fn split_root(&mut self, old_root: Handle) {
        let (promoted, right) = self.split_node(old_root);

        let mut root = InternalNode::new();
        root.add_child(old_root);
        root.push_back(promoted, right);
        let root = self.nodes.alloc(Node::Internal(root));
        self.adopt_children(root);
        self.root = Some(root);

        self.stats.root_splits += 1;
        debug!(root = ?root, promoted, "new root");
    }

    /// Divides `node` in two. The new right half is allocated, given `node`'s parent,
    /// and returned together with the key to promote. The caller links the pair into
    /// the parent.
    fn split_node(&mut self, node: Handle) -> (Key, Handle) {
        let (promoted, right) = if self.nodes.get(node).is_leaf() {
            self.split_leaf(node)
        } else {
            self.split_internal(node)
        };
        let parent = self.nodes.get(node).parent();
        self.nodes.get_mut(right).set_parent(parent);
        (promoted, right)
    }

    fn split_leaf(&mut self, node: Handle) -> (Key, Handle) {
        let leaf = self.nodes.get_mut(node).as_leaf_mut();
        let mut right = leaf.split();
        let old_next = leaf.next();
        let promoted = right.first_key().expect("leaf split produced an empty right half");
        right.set_prev(Some(node));
        right.set_next(old_next);

        let right = self.nodes.alloc(Node::Leaf(right));
        self.nodes.get_mut(node).as_leaf_mut().set_next(Some(right));
        match old_next {
            Some(next) => self.nodes.get_mut(next).as_leaf_mut().set_prev(Some(right)),
            None => self.last_leaf = Some(right),
        }

        self.stats.leaf_splits += 1;
        debug!(left = ?node, right = ?right, promoted, "split leaf");
        (promoted, right)
    }

    fn split_internal(&mut self, node: Handle) -> (Key, Handle) {
        let (promoted, right) = self.nodes.get_mut(node).as_internal_mut().split();
        let right = self.nodes.alloc(Node::Internal(right));
        self.adopt_children(right);

        self.stats.internal_splits += 1;
        debug!(left = ?node, right = ?right, promoted, "split internal node");
        (promoted, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FillPolicy;
    use crate::policy::TreeConfig;

    fn tree(order: usize, policy: FillPolicy, keys: &[Key]) -> RawTree<Key> {
        let bounds = TreeConfig::new(order, policy).validate().unwrap();
        let mut tree = RawTree::new(bounds, policy);
        for &key in keys {
            tree.insert(key, key);
            tree.check_invariants().unwrap();
        }
        tree
    }

    fn leaves(tree: &RawTree<Key>) -> Vec<Vec<Key>> {
        let mut out = Vec::new();
        let mut current = tree.first_leaf();
        while let Some(handle) = current {
            let leaf = tree.node(handle).as_leaf();
            out.push(leaf.keys().to_vec());
            current = leaf.next();
        }
        out
    }

    #[test]
    fn split_merge_always_splits() {
        let tree = tree(3, FillPolicy::SPLIT_MERGE, &[10, 20, 5, 6, 12, 30]);
        assert_eq!(leaves(&tree), vec![vec![5, 6], vec![10], vec![12], vec![20, 30]]);
        assert_eq!(tree.stats().leaf_splits, 3);
        assert_eq!(tree.stats().internal_splits, 1);
        assert_eq!(tree.stats().redistributions, 0);
    }

    #[test]
    fn redistribute_first_donates_to_left_sibling() {
        // [5,6] [10] [12,20] before 30 arrives; the overflowing leaf passes 12 to [10]
        // instead of splitting.
        let tree = tree(3, FillPolicy::REDISTRIBUTE_FIRST, &[10, 20, 5, 6, 12, 30]);
        assert_eq!(leaves(&tree), vec![vec![5, 6], vec![10, 12], vec![20, 30]]);
        assert_eq!(tree.stats().leaf_splits, 2);
        assert_eq!(tree.stats().redistributions, 1);
    }

    #[test]
    fn redistribute_first_donates_right_when_left_is_full() {
        let mut tree = tree(4, FillPolicy::REDISTRIBUTE_FIRST, &[1, 2, 3, 4]);
        // [1,2] [3,4]
        assert_eq!(leaves(&tree), vec![vec![1, 2], vec![3, 4]]);
        tree.insert(0, 0);
        // [0,1,2] [3,4]
        tree.insert(-1, -1);
        // Left-most leaf has no left sibling, so it donates 2 to the right.
        assert_eq!(leaves(&tree), vec![vec![-1, 0, 1], vec![2, 3, 4]]);
        assert_eq!(tree.stats().redistributions, 1);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn cascading_splits_grow_height() {
        let tree = tree(3, FillPolicy::SPLIT_MERGE, &(1..=32).collect::<Vec<_>>());
        assert!(tree.height() >= 4);
        assert!(tree.stats().internal_splits > 0);
        assert_eq!(tree.stats().root_splits as usize, tree.height() - 1);
    }

    #[test]
    fn descending_inserts_redistribute_internal_nodes() {
        let tree = tree(3, FillPolicy::REDISTRIBUTE_FIRST, &(1..=64).rev().collect::<Vec<_>>());
        assert_eq!(leaves(&tree).concat(), (1..=64).collect::<Vec<_>>());
        assert!(tree.stats().redistributions > 0);
    }
}
