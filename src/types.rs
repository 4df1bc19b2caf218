#![forbid(unsafe_code)]

//! Identifiers and the error type shared by every layer of the compiler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node inside one [`QueryGraph`](crate::graph::QueryGraph).
///
/// Identifiers are only unique within a graph instance and are handed out
/// again after a reset.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Identifier of a link inside one [`QueryGraph`](crate::graph::QueryGraph).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for u64 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

/// Errors raised while mutating the query graph or compiling statements.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryGraphError {
    /// Referenced node does not exist in the graph.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// Referenced link does not exist in the graph.
    #[error("unknown link {0}")]
    UnknownLink(LinkId),
    /// A root node was added to a graph that already holds nodes.
    #[error("graph already has a root node")]
    RootAlreadyPresent,
    /// The graph has no root node yet.
    #[error("graph has no root node")]
    MissingRoot,
    /// A root-ward walk visited the same node twice.
    #[error("cycle detected while walking from node {node} to the root")]
    CyclicGraph {
        /// Node at which the cycle was detected.
        node: NodeId,
    },
    /// A root-ward walk reached a node without an incoming link.
    #[error("node {node} is not connected to the root")]
    DetachedNode {
        /// First node without an incoming link.
        node: NodeId,
    },
    /// The arguments violate a graph invariant.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The transport reported a failure.
    #[error("transport: {0}")]
    Transport(String),
    /// A response arrived for a request that is no longer current.
    #[error("stale response for request {token}")]
    StaleResponse {
        /// Correlation token of the rejected response.
        token: u64,
    },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, QueryGraphError>;
