use smallvec::SmallVec;

use super::handle::Handle;
use crate::Key;

/// Entries kept inline before a node spills to the heap. Orders up to 9 never allocate
/// for their key, value, or child lists.
pub(crate) const INLINE_KEYS: usize = 9;

pub(crate) type Keys = SmallVec<[Key; INLINE_KEYS]>;
pub(crate) type Children = SmallVec<[Handle; INLINE_KEYS + 1]>;

#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<V> {
    Internal(InternalNode),
    Leaf(LeafNode<V>),
}

// Internal nodes route by separator: keys[i] is the smallest key under children[i + 1].
pub(crate) struct InternalNode {
    parent: Option<Handle>,
    keys: Keys,
    children: Children,
}

// Leaves hold the entries plus the doubly linked leaf chain.
pub(crate) struct LeafNode<V> {
    parent: Option<Handle>,
    prev: Option<Handle>,
    next: Option<Handle>,
    keys: Keys,
    values: SmallVec<[V; INLINE_KEYS]>,
}

/// Result of searching for a key in a leaf.
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

impl<V> Node<V> {
    pub(crate) fn new_leaf() -> Self {
        Node::Leaf(LeafNode::new())
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node, panicking if this is not internal.
    pub(crate) fn as_internal(&self) -> &InternalNode {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        match self {
            Node::Internal(internal) => internal.key_count(),
            Node::Leaf(leaf) => leaf.key_count(),
        }
    }

    pub(crate) fn keys(&self) -> &[Key] {
        match self {
            Node::Internal(internal) => internal.keys(),
            Node::Leaf(leaf) => leaf.keys(),
        }
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        match self {
            Node::Internal(internal) => internal.parent,
            Node::Leaf(leaf) => leaf.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        match self {
            Node::Internal(internal) => internal.parent = parent,
            Node::Leaf(leaf) => leaf.parent = parent,
        }
    }
}

impl InternalNode {
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            keys: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> Key {
        self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub(crate) fn set_key(&mut self, index: usize, key: Key) {
        self.keys[index] = key;
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Index of the child whose subtree may hold `key`: the smallest `i` with
    /// `key < keys[i]`, so a key equal to a separator routes right.
    #[inline]
    pub(crate) fn find_child_index(&self, key: Key) -> usize {
        self.keys.partition_point(|&separator| separator <= key)
    }

    /// Position of `child` among this node's children.
    pub(crate) fn position_of(&self, child: Handle) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Appends a child without a separator. Only valid as the first child of a fresh node.
    pub(crate) fn add_child(&mut self, child: Handle) {
        debug_assert!(self.children.is_empty(), "first child added to a populated node");
        self.children.push(child);
    }

    /// Inserts `key` at `index` and `child` immediately to its right.
    pub(crate) fn insert_child_at(&mut self, index: usize, key: Key, child: Handle) {
        self.keys.insert(index, key);
        self.children.insert(index + 1, child);
    }

    /// Removes the separator at `index` together with the child to its right.
    pub(crate) fn remove_child(&mut self, index: usize) -> (Key, Handle) {
        let key = self.keys.remove(index);
        let child = self.children.remove(index + 1);
        (key, child)
    }

    pub(crate) fn push_back(&mut self, key: Key, child: Handle) {
        self.keys.push(key);
        self.children.push(child);
    }

    pub(crate) fn push_front(&mut self, key: Key, child: Handle) {
        self.keys.insert(0, key);
        self.children.insert(0, child);
    }

    /// Removes the last separator and the last child.
    pub(crate) fn pop_back(&mut self) -> Option<(Key, Handle)> {
        let key = self.keys.pop()?;
        let child = self.children.pop()?;
        Some((key, child))
    }

    /// Removes the first separator and the first child.
    pub(crate) fn pop_front(&mut self) -> Option<(Key, Handle)> {
        if self.keys.is_empty() {
            return None;
        }
        Some((self.keys.remove(0), self.children.remove(0)))
    }

    /// Splits an overflowing node at its midpoint. The midpoint key is returned for
    /// promotion and kept in neither half; the right half is returned as a new node
    /// whose children still point at this node as their parent.
    pub(crate) fn split(&mut self) -> (Key, InternalNode) {
        let mid = self.keys.len() / 2;

        let mut right = InternalNode::new();
        right.keys = self.keys.drain(mid + 1..).collect();
        right.children = self.children.drain(mid + 1..).collect();

        let promoted = self.keys.pop().expect("split of an internal node without keys");
        (promoted, right)
    }

    /// Appends the parent separator and all of `right`'s entries.
    pub(crate) fn absorb(&mut self, separator: Key, right: InternalNode) {
        self.keys.push(separator);
        self.keys.extend(right.keys);
        self.children.extend(right.children);
    }
}

impl<V> LeafNode<V> {
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            prev: None,
            next: None,
            keys: SmallVec::new(),
            values: SmallVec::new(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> Key {
        self.keys[index]
    }

    pub(crate) fn first_key(&self) -> Option<Key> {
        self.keys.first().copied()
    }

    #[inline]
    pub(crate) fn value(&self, index: usize) -> &V {
        &self.values[index]
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<Handle>) {
        self.prev = prev;
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    #[inline]
    pub(crate) fn search(&self, key: Key) -> SearchResult {
        match self.keys.binary_search(&key) {
            Ok(idx) => SearchResult::Found(idx),
            Err(idx) => SearchResult::NotFound(idx),
        }
    }

    /// Returns the value paired with `key`, if present.
    pub(crate) fn get(&self, key: Key) -> Option<&V> {
        match self.search(key) {
            SearchResult::Found(idx) => Some(&self.values[idx]),
            SearchResult::NotFound(_) => None,
        }
    }

    /// Inserts keeping keys ascending. An existing key has its value replaced and the
    /// previous value is returned.
    pub(crate) fn insert(&mut self, key: Key, value: V) -> Option<V> {
        match self.search(key) {
            SearchResult::Found(idx) => Some(core::mem::replace(&mut self.values[idx], value)),
            SearchResult::NotFound(idx) => {
                self.keys.insert(idx, key);
                self.values.insert(idx, value);
                None
            }
        }
    }

    /// Removes `key`, returning the index it occupied and its value.
    pub(crate) fn remove(&mut self, key: Key) -> Option<(usize, V)> {
        match self.search(key) {
            SearchResult::Found(idx) => {
                self.keys.remove(idx);
                Some((idx, self.values.remove(idx)))
            }
            SearchResult::NotFound(_) => None,
        }
    }

    pub(crate) fn push_back(&mut self, key: Key, value: V) {
        self.keys.push(key);
        self.values.push(value);
    }

    pub(crate) fn push_front(&mut self, key: Key, value: V) {
        self.keys.insert(0, key);
        self.values.insert(0, value);
    }

    pub(crate) fn pop_back(&mut self) -> Option<(Key, V)> {
        let key = self.keys.pop()?;
        let value = self.values.pop()?;
        Some((key, value))
    }

    pub(crate) fn pop_front(&mut self) -> Option<(Key, V)> {
        if self.keys.is_empty() {
            return None;
        }
        Some((self.keys.remove(0), self.values.remove(0)))
    }

    /// Splits at `len / 2`: the entry at the midpoint and everything after it move to
    /// the returned right leaf. Chain links are left for the caller, which knows the
    /// handles involved.
    pub(crate) fn split(&mut self) -> LeafNode<V> {
        let mid = self.keys.len() / 2;

        let mut right = LeafNode::new();
        right.keys = self.keys.drain(mid..).collect();
        right.values = self.values.drain(mid..).collect();
        right
    }

    /// Appends all of `right`'s entries and takes over its `next` link.
    pub(crate) fn absorb(&mut self, right: LeafNode<V>) {
        self.keys.extend(right.keys);
        self.values.extend(right.values);
        self.next = right.next;
    }

    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = (Key, &V)> {
        self.keys.iter().copied().zip(self.values.iter())
    }
}
