//! Error types for colorflow operations.
//!
//! Every failure the engine reports falls into one of the kinds of
//! [`ErrorKind`]. Graph-building problems are reported when the graph is
//! built; everything else is reported by the pull that hit it.
//!
//! # Usage
//!
//! ```rust
//! use colorflow_core::{EngineError, ErrorKind, NodeId, Rect};
//!
//! let err = EngineError::incompatible_data("planar layouts are not accepted")
//!     .at(NodeId(3), Rect::new(0, 0, 4, 4));
//! assert_eq!(err.kind(), ErrorKind::IncompatibleData);
//! assert_eq!(err.node(), Some(NodeId(3)));
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation

use crate::{NodeId, Rect};
use thiserror::Error;

/// Result type alias using [`EngineError`] as the error type.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Error category, independent of where in the graph it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Producer and consumer connectors cannot be joined.
    IncompatibleConnector,
    /// A node cannot consume the pixel layout it was handed.
    IncompatibleData,
    /// A filter rejected an option value.
    IncompatibleOption,
    /// A transform context could not be built.
    IncompatibleContext,
    /// The request was cancelled through its ticket.
    Cancelled,
    /// A buffer or context could not be allocated.
    MemoryError,
    /// A value that had to exist was not found.
    NotFound,
}

/// Errors raised by the colorflow engine.
///
/// The message-carrying variants map one-to-one onto [`ErrorKind`].
/// [`EngineError::Pull`] wraps the first error of a failed pull with the
/// node and rectangle that produced it; it is added once, by the
/// innermost failing node.
///
/// The type is `Clone` so that a failed context build can be reported to
/// every caller that was waiting on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Connectors do not match, or the graph is not fully connected.
    #[error("incompatible connector: {0}")]
    IncompatibleConnector(String),

    /// Pixel layout rejected by a node.
    #[error("incompatible data: {0}")]
    IncompatibleData(String),

    /// Option value rejected by a filter.
    #[error("incompatible option `{key}`: {reason}")]
    IncompatibleOption {
        /// Option key
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Context construction failed.
    #[error("incompatible context: {0}")]
    IncompatibleContext(String),

    /// Request cancelled.
    #[error("cancelled")]
    Cancelled,

    /// Allocation failed.
    #[error("failed to allocate {requested} bytes: {reason}")]
    MemoryError {
        /// Bytes requested
        requested: usize,
        /// Failure reason
        reason: String,
    },

    /// Lookup miss.
    #[error("not found: {0}")]
    NotFound(String),

    /// A pull failed at `node` while producing `rect`.
    #[error("node {node} failed on {rect}: {source}")]
    Pull {
        /// Node that raised the error
        node: NodeId,
        /// Rectangle the node was asked for, in its own sample units
        rect: Rect,
        /// The underlying error
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Creates an [`EngineError::IncompatibleData`] error.
    #[inline]
    pub fn incompatible_data(msg: impl Into<String>) -> Self {
        Self::IncompatibleData(msg.into())
    }

    /// Creates an [`EngineError::IncompatibleOption`] error.
    #[inline]
    pub fn incompatible_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IncompatibleOption {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`EngineError::IncompatibleContext`] error.
    #[inline]
    pub fn incompatible_context(msg: impl Into<String>) -> Self {
        Self::IncompatibleContext(msg.into())
    }

    /// Creates an [`EngineError::MemoryError`] error.
    #[inline]
    pub fn memory(requested: usize, reason: impl Into<String>) -> Self {
        Self::MemoryError {
            requested,
            reason: reason.into(),
        }
    }

    /// Creates an [`EngineError::NotFound`] error.
    #[inline]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Attaches the failing node and rectangle.
    ///
    /// An error that already carries a location is returned unchanged, so
    /// the innermost node wins.
    pub fn at(self, node: NodeId, rect: Rect) -> Self {
        match self {
            Self::Pull { .. } => self,
            other => Self::Pull {
                node,
                rect,
                source: Box::new(other),
            },
        }
    }

    /// Returns the error category, looking through [`EngineError::Pull`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IncompatibleConnector(_) => ErrorKind::IncompatibleConnector,
            Self::IncompatibleData(_) => ErrorKind::IncompatibleData,
            Self::IncompatibleOption { .. } => ErrorKind::IncompatibleOption,
            Self::IncompatibleContext(_) => ErrorKind::IncompatibleContext,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::MemoryError { .. } => ErrorKind::MemoryError,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Pull { source, .. } => source.kind(),
        }
    }

    /// Node that raised the error, if known.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Pull { node, .. } => Some(*node),
            _ => None,
        }
    }

    /// Rectangle that was being produced, if known.
    pub fn rect(&self) -> Option<Rect> {
        match self {
            Self::Pull { rect, .. } => Some(*rect),
            _ => None,
        }
    }

    /// Returns `true` for [`ErrorKind::Cancelled`].
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_through_pull() {
        let err = EngineError::Cancelled.at(NodeId(7), Rect::new(1, 2, 3, 4));
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.rect(), Some(Rect::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_innermost_location_wins() {
        let err = EngineError::not_found("lut")
            .at(NodeId(1), Rect::new(0, 0, 1, 1))
            .at(NodeId(2), Rect::new(0, 0, 2, 2));
        assert_eq!(err.node(), Some(NodeId(1)));
    }

    #[test]
    fn test_messages() {
        let err = EngineError::memory(1 << 30, "out of memory");
        assert!(err.to_string().contains("out of memory"));

        let err = EngineError::incompatible_option("offset", "not a number");
        let msg = err.to_string();
        assert!(msg.contains("offset"));
        assert!(msg.contains("not a number"));
    }
}
