//! In-memory B+ tree index from `i64` keys to payloads, with two rebalancing policies.
//!
//! [`IndexTree`] stores entries only in its leaves, which are chained in key order for
//! range scans and ordered traversal. The [`FillPolicy`] chosen at construction decides
//! how nodes are kept balanced:
//!
//! - [`FillPolicy::SPLIT_MERGE`] (B+ style): an overflowing node always splits; an
//!   underfull node borrows from a sibling, or merges with one, at half capacity.
//! - [`FillPolicy::REDISTRIBUTE_FIRST`] (B* style): an overflowing node first hands an
//!   entry to a sibling with room; removals rebalance at two-thirds capacity.
//!
//! # Example
//!
//! ```
//! use arbor_index::{IndexTree, PolicyKind};
//!
//! let mut index = IndexTree::new(3, PolicyKind::SplitMerge).unwrap();
//! for key in [10, 20, 5, 6, 12, 30, 7, 17] {
//!     index.insert(key, format!("product {key}"));
//! }
//!
//! let keys: Vec<i64> = index.keys().collect();
//! assert_eq!(keys, [5, 6, 7, 10, 12, 17, 20, 30]);
//!
//! let hits = index.range_scan(6, 12);
//! assert_eq!(hits, ["product 6", "product 7", "product 10", "product 12"]);
//!
//! assert!(index.remove(7));
//! assert_eq!(index.search(7), None);
//! index.check_invariants().unwrap();
//! ```
//!
//! # Implementation
//!
//! Nodes live in an arena and refer to each other by compact handles: internal nodes
//! own their children, while parent links and the leaf chain are plain handles.
//! Overflow and underflow propagate upward by following parent links.
//!
//! The [`loader`] and [`workload`] modules parse product records and time bulk
//! batches against a tree.

#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod error;
mod index_tree;
mod policy;
mod raw;
mod stats;

pub mod loader;
pub mod workload;

pub use error::{Error, Result};
pub use index_tree::{IndexTree, Iter, Range};
pub use policy::{FillBounds, FillPolicy, MinFill, PolicyKind, TreeConfig};
pub use stats::TreeStats;

/// Key type of every [`IndexTree`].
pub type Key = i64;
