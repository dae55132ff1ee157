use super::handle::Handle;
use super::node::Node;
use super::tree::RawTree;
use crate::Key;
use crate::error::{Error, Result};

/// Key range a subtree must fall in: `lower <= key < upper`, either end open.
#[derive(Clone, Copy)]
struct Span {
    lower: Option<Key>,
    upper: Option<Key>,
}

impl Span {
    const ALL: Span = Span { lower: None, upper: None };

    fn contains(&self, key: Key) -> bool {
        self.lower.is_none_or(|lower| lower <= key) && self.upper.is_none_or(|upper| key < upper)
    }
}

struct Walk {
    leaf_depth: Option<usize>,
    leaves: Vec<Handle>,
    reachable: usize,
    errors: Vec<String>,
}

impl<V> RawTree<V> {
    /// Validates every structural invariant and reports all violations at once.
    ///
    /// Checks key order, equal leaf depth, fill bounds for non-root nodes, exact
    /// separators (each equals the smallest key under its right child), parent links,
    /// both directions of the leaf chain, the entry count, and that no arena slot is
    /// leaked.
    pub(crate) fn check_invariants(&self) -> Result<()> {
        let Some(root) = self.root else {
            return self.check_released_root();
        };

        let mut walk = Walk {
            leaf_depth: None,
            leaves: Vec::new(),
            reachable: 0,
            errors: Vec::new(),
        };

        if self.nodes.get(root).parent().is_some() {
            walk.errors.push(format!("root {root:?} has a parent"));
        }
        if let Node::Internal(internal) = self.nodes.get(root)
            && internal.key_count() == 0
        {
            walk.errors.push(format!("internal root {root:?} has no keys"));
        }

        self.validate_node(root, 0, Span::ALL, &mut walk);
        self.validate_leaf_chain(&walk.leaves, &mut walk.errors);

        let actual: usize = walk.leaves.iter().map(|&h| self.nodes.get(h).key_count()).sum();
        if self.len != actual {
            walk.errors.push(format!("len mismatch: len={}, actual count={actual}", self.len));
        }
        if walk.reachable != self.nodes.len() {
            walk.errors.push(format!(
                "{} nodes reachable from the root, {} live in the arena",
                walk.reachable,
                self.nodes.len()
            ));
        }

        if walk.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Corrupted(walk.errors.join("\n")))
        }
    }

    fn check_released_root(&self) -> Result<()> {
        let mut errors = Vec::new();
        if !self.policy.release_empty_root {
            errors.push("root released under a policy that keeps an empty root leaf".to_owned());
        }
        if self.len != 0 {
            errors.push(format!("no root but len={}", self.len));
        }
        if self.first_leaf.is_some() || self.last_leaf.is_some() {
            errors.push("no root but the leaf chain has ends".to_owned());
        }
        if self.nodes.len() != 0 {
            errors.push(format!("no root but {} nodes live in the arena", self.nodes.len()));
        }

        if errors.is_empty() { Ok(()) } else { Err(Error::Corrupted(errors.join("\n"))) }
    }

    /// Returns the smallest key in the subtree, if any.
    fn validate_node(
        &self,
        handle: Handle,
        depth: usize,
        span: Span,
        walk: &mut Walk,
    ) -> Option<Key> {
        walk.reachable += 1;
        let node = self.nodes.get(handle);
        let is_root = self.root == Some(handle);
        let count = node.key_count();

        let keys = node.keys();
        for i in 1..keys.len() {
            if keys[i - 1] >= keys[i] {
                let previous = i - 1;
                walk.errors.push(format!(
                    "keys not ascending at {handle:?}, indices {previous} and {i}"
                ));
            }
        }
        if let Some(&key) = keys.iter().find(|&&k| !span.contains(k)) {
            walk.errors.push(format!(
                "key {key} at {handle:?} lies outside its parent's separators"
            ));
        }

        if count > self.bounds.max_keys() {
            walk.errors.push(format!(
                "{handle:?} holds {count} keys, max is {}",
                self.bounds.max_keys()
            ));
        }
        if !is_root && count < self.bounds.floor(node.is_leaf()) {
            walk.errors.push(format!(
                "{handle:?} holds {count} keys, floor is {}",
                self.bounds.floor(node.is_leaf())
            ));
        }

        match node {
            Node::Leaf(leaf) => {
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        walk.errors.push(format!(
                            "leaf {handle:?} at depth {depth}, expected {expected}"
                        ));
                    }
                    Some(_) => {}
                }
                walk.leaves.push(handle);
                leaf.first_key()
            }
            Node::Internal(internal) => {
                if internal.child_count() != internal.key_count() + 1 {
                    walk.errors.push(format!(
                        "{handle:?} has {} keys and {} children",
                        internal.key_count(),
                        internal.child_count()
                    ));
                    return None;
                }

                let mut min = None;
                for (i, &child) in internal.children().iter().enumerate() {
                    if self.nodes.get(child).parent() != Some(handle) {
                        walk.errors.push(format!(
                            "child {child:?} of {handle:?} names {:?} as its parent",
                            self.nodes.get(child).parent()
                        ));
                    }

                    let lower = if i == 0 { span.lower } else { Some(internal.key(i - 1)) };
                    let upper = if i < internal.key_count() {
                        Some(internal.key(i))
                    } else {
                        span.upper
                    };
                    let child_span = Span { lower, upper };
                    let child_min = self.validate_node(child, depth + 1, child_span, walk);

                    if i == 0 {
                        min = child_min;
                    } else if child_min != Some(internal.key(i - 1)) {
                        let (index, separator) = (i - 1, internal.key(i - 1));
                        walk.errors.push(format!(
                            "separator {separator} at {handle:?} index {index} \
                             but child {i} starts at {child_min:?}"
                        ));
                    }
                }
                min
            }
        }
    }

    fn validate_leaf_chain(&self, leaves: &[Handle], errors: &mut Vec<String>) {
        if self.first_leaf != leaves.first().copied() {
            errors.push(format!(
                "first_leaf is {:?}, expected {:?}",
                self.first_leaf,
                leaves.first()
            ));
        }
        if self.last_leaf != leaves.last().copied() {
            errors.push(format!("last_leaf is {:?}, expected {:?}", self.last_leaf, leaves.last()));
        }

        for (i, &handle) in leaves.iter().enumerate() {
            let leaf = self.nodes.get(handle).as_leaf();
            let expected_next = leaves.get(i + 1).copied();
            let expected_prev = i.checked_sub(1).map(|p| leaves[p]);
            if leaf.next() != expected_next {
                errors.push(format!(
                    "leaf {i} next is {:?}, expected {expected_next:?}",
                    leaf.next()
                ));
            }
            if leaf.prev() != expected_prev {
                errors.push(format!(
                    "leaf {i} prev is {:?}, expected {expected_prev:?}",
                    leaf.prev()
                ));
            }
        }
    }
}
