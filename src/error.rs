//! Crate-wide error type.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LeakError>;

/// Errors surfaced by snapshot ingestion and graph queries.
#[derive(Debug, Error)]
pub enum LeakError {
    /// The chunk stream violated the snapshot layout contract.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    /// An edge carried a type code outside the known vocabulary.
    #[error("unrecognized edge type: {0}")]
    UnrecognizedEdgeType(u8),
    /// Indexed child lookup past the end of a node's edge range.
    #[error("child {index} out of range (node has {len} edges)")]
    OutOfRange {
        /// Requested child position.
        index: usize,
        /// Number of edges owned by the node.
        len: usize,
    },
    /// The snapshot source reported a failure of its own.
    #[error("snapshot source error: {0}")]
    Source(String),
    /// Invalid caller-supplied argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl LeakError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        LeakError::MalformedSnapshot(msg.into())
    }

    /// Returns `true` for errors caused by an invalid snapshot stream.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            LeakError::MalformedSnapshot(_) | LeakError::UnrecognizedEdgeType(_)
        )
    }
}
