//! Error types for graph construction and interpretation
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.
//! Only the `start` preconditions ([`WorkflowError::NoStartNode`],
//! [`WorkflowError::MultipleStartNodes`]) are recoverable; every other
//! variant indicates an invariant violation or a failed backend call and
//! aborts the current interpreter invocation.

use thiserror::Error;

use crate::engine::EngineError;
use crate::graph::{ArcId, NodeId};
use crate::token::NodeTokenId;

/// Convenience result type using [`WorkflowError`]
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors surfaced by graph construction, the interpreter, and the loader
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// No node in the graph satisfies the start predicate
    /// (`name == "start"` and depth `0`)
    #[error("Graph has no start node")]
    NoStartNode,

    /// More than one node satisfies the start predicate
    #[error("Graph has multiple start nodes")]
    MultipleStartNodes,

    /// Two nodes in a graph definition share an id
    #[error("Duplicate node id {0} in graph definition")]
    DuplicateNodeId(NodeId),

    /// Two arcs in a graph definition share an id
    #[error("Duplicate arc id {0} in graph definition")]
    DuplicateArcId(ArcId),

    /// An arc references a node id that is not part of the graph
    #[error("Arc {arc} references unknown node {node}")]
    UnknownArcEndpoint {
        /// Id of the offending arc
        arc: ArcId,
        /// The endpoint that failed to resolve
        node: NodeId,
    },

    /// A live token points at a node id absent from the graph
    #[error("Node {0} is not present in the graph")]
    MissingNode(NodeId),

    /// A live token points at an arc id absent from the graph
    #[error("Arc {0} is not present in the graph")]
    MissingArc(ArcId),

    /// A node declares a type name that is not registered
    #[error("Node type '{0}' is not registered")]
    MissingNodeType(String),

    /// The attribute map has no entry for a live node-token
    #[error("No attribute set for token {0}")]
    MissingTokenAttrs(NodeTokenId),

    /// A backend operation failed; the invocation is aborted and the
    /// backend owns rollback at its next transaction boundary
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Domain-specific failure raised by a guard or accept action,
    /// propagated unchanged
    #[error("Node type error: {0}")]
    NodeType(String),

    /// JSON decoding of a node extra payload or user data failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A workflow definition document failed to parse
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Reading a workflow definition file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// Create a node-type domain error
    ///
    /// Helper for guard and accept implementations that need to fail with
    /// a message of their own.
    pub fn node_type(error: impl Into<String>) -> Self {
        Self::NodeType(error.into())
    }
}
