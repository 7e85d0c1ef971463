//! Error types for the container store

use std::path::PathBuf;

use crate::path::{NodePath, PathError};

/// Errors raised by [`Store`](crate::Store) operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No node at the given path
    #[error("node not found: {0}")]
    NotFound(NodePath),

    /// A node already occupies the given path
    #[error("node already exists: {0}")]
    AlreadyExists(NodePath),

    /// Path names a dataset where a group is required
    #[error("not a group: {0}")]
    NotAGroup(NodePath),

    /// Path names a group where a dataset is required
    #[error("not a dataset: {0}")]
    NotADataset(NodePath),

    /// Move target lies inside the moved subtree, or source is the root
    #[error("cannot move '{from}' to '{to}'")]
    InvalidMove { from: NodePath, to: NodePath },

    /// Write attempted on a read-only container
    #[error("container is read-only")]
    ReadOnly,

    /// Rollback requested with no checkpoint held
    #[error("no checkpoint to roll back to")]
    NoCheckpoint,

    /// Operation attempted after close
    #[error("container is closed")]
    Closed,

    /// Record table shape violation
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Malformed path
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// IO error on the backing file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file content is not a valid container image
    #[error("corrupt container {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the error reports a missing node
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = StoreError::NotFound("Analyses/First_000".parse().unwrap());
        assert_eq!(err.to_string(), "node not found: Analyses/First_000");
        assert!(err.is_not_found());
    }

    #[test]
    fn path_error_converts() {
        let err: StoreError = PathError::EmptySegment.into();
        assert!(matches!(err, StoreError::Path(PathError::EmptySegment)));
        assert!(!err.is_not_found());
    }
}
