//! Graph-building and configuration errors.
//!
//! Pull-time failures use [`EngineError`] directly. The errors here are
//! returned synchronously while a graph is being assembled or an engine is
//! being configured, and never during a pull.

use colorflow_core::{EngineError, NodeId};
use thiserror::Error;

/// Errors from connecting, disconnecting or validating a graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// The socket's connector cannot feed the plug's connector.
    #[error("{from} socket {socket} cannot feed {to} plug {plug}")]
    IncompatibleConnector {
        /// Producing node
        from: NodeId,
        /// Socket index on the producer
        socket: usize,
        /// Consuming node
        to: NodeId,
        /// Plug index on the consumer
        plug: usize,
    },

    /// The plug is already bound to a socket.
    #[error("{node} plug {plug} is already connected")]
    AlreadyConnected {
        /// Consuming node
        node: NodeId,
        /// Plug index
        plug: usize,
    },

    /// No node with that id in the conversion.
    #[error("{0} not found")]
    NodeNotFound(NodeId),

    /// The node has no port with that index.
    #[error("{node} has no {kind} {index}")]
    PortNotFound {
        /// Node
        node: NodeId,
        /// `"plug"` or `"socket"`
        kind: &'static str,
        /// Port index
        index: usize,
    },

    /// The edge would close a cycle.
    #[error("connecting {from} to {to} would create a cycle")]
    WouldCycle {
        /// Producing node
        from: NodeId,
        /// Consuming node
        to: NodeId,
    },

    /// A mandatory plug is unbound, or no output node is set.
    #[error("{0}")]
    Unconnected(String),
}

impl From<ConnectError> for EngineError {
    fn from(err: ConnectError) -> Self {
        EngineError::IncompatibleConnector(err.to_string())
    }
}

/// Result alias for graph-building operations.
pub type ConnectResult<T> = std::result::Result<T, ConnectError>;

/// Errors from loading an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML is malformed or has fields of the wrong type.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field has an out-of-range value.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorflow_core::ErrorKind;

    #[test]
    fn test_connect_error_maps_to_incompatible_connector() {
        let err: EngineError = ConnectError::AlreadyConnected {
            node: NodeId(2),
            plug: 0,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::IncompatibleConnector);
        assert!(err.to_string().contains("node#2"));
    }
}
