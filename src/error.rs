//! Error types for arbor_index.
//!
//! Key absence is not an error: lookups return `Option` and removals return `bool`.
//! This enum covers configuration mistakes, loader failures, and the report produced
//! by [`IndexTree::check_invariants`](crate::IndexTree::check_invariants).

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the index and its loader.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested order cannot form a balanced tree.
    #[error("invalid order {order}: must be at least {min}")]
    InvalidOrder { order: usize, min: usize },

    /// One or more structural invariants do not hold. Indicates an engine defect.
    #[error("tree corrupted:\n{0}")]
    Corrupted(String),

    /// The loader's source could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A loader line did not match `id,name,category`.
    #[error("line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = Error::InvalidOrder { order: 2, min: 3 };
        assert_eq!(err.to_string(), "invalid order 2: must be at least 3");

        let err = Error::MalformedRecord {
            line: 7,
            reason: "expected 3 fields, found 2".into(),
        };
        assert_eq!(err.to_string(), "line 7: expected 3 fields, found 2");
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
