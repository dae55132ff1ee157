use tracing::trace;

use super::arena::Arena;
use super::handle::Handle;
use super::node::Node;
use crate::Key;
use crate::policy::{FillBounds, FillPolicy};
use crate::stats::TreeStats;

/// The engine behind [`IndexTree`](crate::IndexTree).
///
/// One implementation serves every [`FillPolicy`]: descent, lookup and the insert and
/// remove skeletons live here, overflow handling in `overflow.rs`, underflow handling
/// in `underflow.rs`. Upward propagation walks parent handles in a loop.
pub(crate) struct RawTree<V> {
    /// Arena storing all tree nodes. The tree owns every node through it.
    pub(super) nodes: Arena<Node<V>>,
    /// `None` only after a policy with `release_empty_root` removed the last entry.
    pub(super) root: Option<Handle>,
    /// Head of the leaf chain.
    pub(super) first_leaf: Option<Handle>,
    /// Tail of the leaf chain.
    pub(super) last_leaf: Option<Handle>,
    /// Number of key-value pairs stored.
    pub(super) len: usize,
    pub(super) bounds: FillBounds,
    pub(super) policy: FillPolicy,
    pub(super) stats: TreeStats,
}

impl<V> RawTree<V> {
    /// Creates a tree whose root is a single empty leaf.
    pub(crate) fn new(bounds: FillBounds, policy: FillPolicy) -> Self {
        let mut tree = Self {
            nodes: Arena::new(),
            root: None,
            first_leaf: None,
            last_leaf: None,
            len: 0,
            bounds,
            policy,
            stats: TreeStats::default(),
        };
        tree.plant_root();
        tree
    }

    /// Allocates an empty leaf as the root of an empty tree.
    fn plant_root(&mut self) -> Handle {
        debug_assert!(self.root.is_none(), "planting a root over an existing one");
        let leaf = self.nodes.alloc(Node::new_leaf());
        self.root = Some(leaf);
        self.first_leaf = Some(leaf);
        self.last_leaf = Some(leaf);
        leaf
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn root(&self) -> Option<Handle> {
        self.root
    }

    pub(crate) fn first_leaf(&self) -> Option<Handle> {
        self.first_leaf
    }

    pub(crate) fn last_leaf(&self) -> Option<Handle> {
        self.last_leaf
    }

    pub(crate) fn node(&self, handle: Handle) -> &Node<V> {
        self.nodes.get(handle)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn bounds(&self) -> &FillBounds {
        &self.bounds
    }

    pub(crate) fn policy(&self) -> &FillPolicy {
        &self.policy
    }

    pub(crate) fn stats(&self) -> TreeStats {
        self.stats
    }

    pub(crate) fn reset_stats(&mut self) {
        self.stats = TreeStats::default();
    }

    /// Number of levels, counting the leaf level. Zero when there is no root.
    pub(crate) fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(handle) = current {
            height += 1;
            current = match self.nodes.get(handle) {
                Node::Internal(internal) => Some(internal.child(0)),
                Node::Leaf(_) => None,
            };
        }
        height
    }

    /// Drops every node and returns to the freshly constructed state.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.first_leaf = None;
        self.last_leaf = None;
        self.len = 0;
        self.plant_root();
    }

    /// Descends to the leaf whose key range covers `key`.
    pub(crate) fn find_leaf(&self, key: Key) -> Option<Handle> {
        let mut current = self.root?;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    current = internal.child(internal.find_child_index(key));
                }
                Node::Leaf(_) => return Some(current),
            }
        }
    }

    pub(crate) fn get(&self, key: Key) -> Option<&V> {
        let leaf = self.find_leaf(key)?;
        self.nodes.get(leaf).as_leaf().get(key)
    }

    /// Position of the first entry whose key is `>= key`, following the leaf chain
    /// when the covering leaf holds only smaller keys.
    pub(crate) fn lower_bound(&self, key: Key) -> Option<(Handle, usize)> {
        let mut leaf = self.find_leaf(key)?;
        let mut index = self.nodes.get(leaf).as_leaf().keys().partition_point(|&k| k < key);
        loop {
            let node = self.nodes.get(leaf).as_leaf();
            if index < node.key_count() {
                return Some((leaf, index));
            }
            leaf = node.next()?;
            index = 0;
        }
    }

    /// Inserts or replaces. Returns the previous value when `key` was present.
    pub(crate) fn insert(&mut self, key: Key, value: V) -> Option<V> {
        let leaf = match self.find_leaf(key) {
            Some(leaf) => leaf,
            None => self.plant_root(),
        };
        trace!(key, leaf = ?leaf, "insert reached leaf");

        let node = self.nodes.get_mut(leaf).as_leaf_mut();
        let replaced = node.insert(key, value);
        if replaced.is_some() {
            return replaced;
        }
        self.len += 1;

        if node.key_count() > self.bounds.max_keys() {
            self.resolve_overflow(leaf);
        }
        None
    }

    /// Removes `key` and returns its value, rebalancing if the leaf underflows.
    pub(crate) fn remove(&mut self, key: Key) -> Option<V> {
        let leaf = self.find_leaf(key)?;
        let (index, value) = self.nodes.get_mut(leaf).as_leaf_mut().remove(key)?;
        trace!(key, leaf = ?leaf, index, "removed from leaf");
        self.len -= 1;

        if index == 0 {
            self.refresh_separator(leaf);
        }
        self.resolve_underflow(leaf);
        Some(value)
    }

    /// The parent of `node` and the index of `node` among its children.
    pub(super) fn parent_slot(&self, node: Handle) -> Option<(Handle, usize)> {
        let parent = self.nodes.get(node).parent()?;
        let index = self
            .nodes
            .get(parent)
            .as_internal()
            .position_of(node)
            .expect("node missing from its parent's children");
        Some((parent, index))
    }

    /// Points every child of `parent` back at it.
    pub(super) fn adopt_children(&mut self, parent: Handle) {
        let count = self.nodes.get(parent).as_internal().child_count();
        for i in 0..count {
            let child = self.nodes.get(parent).as_internal().child(i);
            self.nodes.get_mut(child).set_parent(Some(parent));
        }
    }

    /// After the smallest key of `leaf` was removed, rewrites the one separator that
    /// named it: the separator left of the nearest ancestor edge that is not a
    /// leftmost child. An emptied leaf takes its successor's first key, which is what
    /// the subtree's minimum becomes once the leaf is repaired.
    fn refresh_separator(&mut self, leaf: Handle) {
        let node = self.nodes.get(leaf).as_leaf();
        let successor = || node.next().and_then(|next| self.nodes.get(next).as_leaf().first_key());
        let Some(new_min) = node.first_key().or_else(successor) else {
            return;
        };

        let mut child = leaf;
        while let Some((parent, index)) = self.parent_slot(child) {
            if index > 0 {
                self.nodes.get_mut(parent).as_internal_mut().set_key(index - 1, new_min);
                return;
            }
            child = parent;
        }
    }

    /// Moves the first entry of child `index + 1` of `parent` to the end of child `index`.
    ///
    /// Leaves move one key/value pair and the parent separator becomes the donor's new
    /// first key. Internal nodes rotate through the parent: the separator comes down
    /// with the donor's first child and the donor's first key goes up.
    pub(super) fn rotate_left(&mut self, parent: Handle, index: usize) {
        let (left, right, separator) = {
            let p = self.nodes.get(parent).as_internal();
            (p.child(index), p.child(index + 1), p.key(index))
        };

        let new_separator = if self.nodes.get(left).is_leaf() {
            let donor = self.nodes.get_mut(right).as_leaf_mut();
            let (key, value) = donor.pop_front().expect("rotation from an empty leaf");
            let boundary = donor.first_key().expect("rotation emptied the donor leaf");
            self.nodes.get_mut(left).as_leaf_mut().push_back(key, value);
            boundary
        } else {
            let (key, child) = self
                .nodes
                .get_mut(right)
                .as_internal_mut()
                .pop_front()
                .expect("rotation from a keyless internal node");
            self.nodes.get_mut(left).as_internal_mut().push_back(separator, child);
            self.nodes.get_mut(child).set_parent(Some(left));
            key
        };
        self.nodes.get_mut(parent).as_internal_mut().set_key(index, new_separator);
    }

    /// Moves the last entry of child `index` of `parent` to the front of child `index + 1`.
    /// Mirror image of [`rotate_left`](Self::rotate_left).
    pub(super) fn rotate_right(&mut self, parent: Handle, index: usize) {
        let (left, right, separator) = {
            let p = self.nodes.get(parent).as_internal();
            (p.child(index), p.child(index + 1), p.key(index))
        };

        let new_separator = if self.nodes.get(left).is_leaf() {
            let (key, value) = self
                .nodes
                .get_mut(left)
                .as_leaf_mut()
                .pop_back()
                .expect("rotation from an empty leaf");
            self.nodes.get_mut(right).as_leaf_mut().push_front(key, value);
            key
        } else {
            let (key, child) = self
                .nodes
                .get_mut(left)
                .as_internal_mut()
                .pop_back()
                .expect("rotation from a keyless internal node");
            self.nodes.get_mut(right).as_internal_mut().push_front(separator, child);
            self.nodes.get_mut(child).set_parent(Some(right));
            key
        };
        self.nodes.get_mut(parent).as_internal_mut().set_key(index, new_separator);
    }

    /// Appends every entry reachable from `handle`, in key order, by walking child
    /// links rather than the leaf chain.
    pub(crate) fn collect_in_order<'a>(&'a self, handle: Handle, out: &mut Vec<(Key, &'a V)>) {
        match self.nodes.get(handle) {
            Node::Leaf(leaf) => out.extend(leaf.iter()),
            Node::Internal(internal) => {
                for &child in internal.children() {
                    self.collect_in_order(child, out);
                }
            }
        }
    }
}
