//! Token types: node-tokens, arc-tokens, and token attributes

use serde::{Deserialize, Serialize};

use crate::graph::{ArcId, NodeId};

/// Unique node-token identifier within a process
pub type NodeTokenId = u64;

/// Unique arc-token identifier within a process
pub type ArcTokenId = u64;

/// A token parked at a node, either executing or awaiting external input
///
/// Created when a token enters a node, destroyed when the node completes,
/// discards, or skips. Equality is id equality only; the backend guarantees
/// ids are unique within a process, so removal by first equality match is
/// exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeToken {
    /// Backend-allocated id, unique within the process
    pub id: NodeTokenId,

    /// The node the token currently sits at
    pub node_id: NodeId,
}

impl PartialEq for NodeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeToken {}

/// A token in transit along an arc
///
/// Created when a node completes along a matching output arc, destroyed
/// when the target node consumes it — immediately for non-join targets,
/// after the join cohort completes for join targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcToken {
    /// Backend-allocated id, unique within the process
    pub id: ArcTokenId,

    /// The arc the token traverses
    pub arc_id: ArcId,

    /// The node-token that produced this arc-token
    pub parent: NodeTokenId,
}

impl PartialEq for ArcToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ArcToken {}

/// One attribute entry associated with a node-token
///
/// Keys are unique per node-token: setting a key replaces its prior value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAttr {
    /// Id of the node-token the attribute belongs to
    pub attr_set_id: NodeTokenId,

    /// Attribute key, unique within the token's attribute set
    pub key: String,

    /// Attribute value
    pub value: String,
}

impl TokenAttr {
    /// Create an attribute entry for the given token id
    pub fn new(attr_set_id: NodeTokenId, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attr_set_id,
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_equality_is_id_only() {
        let a = NodeToken { id: 1, node_id: 10 };
        let b = NodeToken { id: 1, node_id: 20 };
        let c = NodeToken { id: 2, node_id: 10 };
        assert_eq!(a, b);
        assert_ne!(a, c);

        let x = ArcToken { id: 7, arc_id: 1, parent: 1 };
        let y = ArcToken { id: 7, arc_id: 2, parent: 9 };
        assert_eq!(x, y);
    }
}
