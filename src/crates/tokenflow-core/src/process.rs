//! Mutable state of one running workflow instance

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, WorkflowError};
use crate::graph::{Graph, GraphArc, Node};
use crate::registry::{NodeType, NodeTypeRegistry};
use crate::token::{ArcToken, NodeToken, NodeTokenId, TokenAttr};

/// Unique process identifier, allocated by the engine backend
pub type ProcessId = u64;

/// One running instance of a workflow
///
/// The process exclusively owns its live token lists and attribute map;
/// the [`Graph`] and [`NodeTypeRegistry`] are shared, read-only references
/// held for its lifetime. All persistent mutation flows through the engine
/// backend — the process value is what the backend materializes and what
/// the interpreter advances.
///
/// A process is *complete* iff both live token lists are empty. A parked
/// node-token (an idle human-task node, an unfired join input) keeps the
/// process incomplete.
#[derive(Debug, Clone)]
pub struct Process {
    /// Backend-allocated process id
    pub id: ProcessId,

    /// The workflow being interpreted
    pub graph: Arc<Graph>,

    /// Behaviors for the graph's node types
    pub registry: Arc<NodeTypeRegistry>,

    /// Live node-tokens, most recently created first
    pub node_tokens: Vec<NodeToken>,

    /// Live arc-tokens, most recently created first
    pub arc_tokens: Vec<ArcToken>,

    /// Attribute lists keyed by node-token id
    pub attrs: HashMap<NodeTokenId, Vec<TokenAttr>>,

    /// Opaque user payload
    pub user_data: Value,
}

impl Process {
    /// Whether the process has run to completion
    pub fn is_complete(&self) -> bool {
        self.node_tokens.is_empty() && self.arc_tokens.is_empty()
    }

    /// Find a live node-token by id
    pub fn node_token_for_id(&self, id: NodeTokenId) -> Option<&NodeToken> {
        self.node_tokens.iter().find(|t| t.id == id)
    }

    /// The node a node-token currently sits at
    pub fn node_for_token(&self, token: &NodeToken) -> Result<&Node> {
        self.graph
            .node(token.node_id)
            .ok_or(WorkflowError::MissingNode(token.node_id))
    }

    /// The arc an arc-token traverses
    pub fn arc_for_token(&self, token: &ArcToken) -> Result<&GraphArc> {
        self.graph
            .arc(token.arc_id)
            .ok_or(WorkflowError::MissingArc(token.arc_id))
    }

    /// The registered node type for a node
    pub fn node_type(&self, node: &Node) -> Result<&NodeType> {
        self.registry.node_type(&node.type_name)
    }

    /// The attribute list of a node-token
    ///
    /// Every token the backend created has an entry, possibly empty; a
    /// missing entry is an invariant violation.
    pub fn token_attrs(&self, token: &NodeToken) -> Result<&[TokenAttr]> {
        self.attrs
            .get(&token.id)
            .map(Vec::as_slice)
            .ok_or(WorkflowError::MissingTokenAttrs(token.id))
    }

    /// The value of one attribute of a node-token
    ///
    /// Returns `Some` iff the token's attribute list contains exactly one
    /// entry for the key.
    pub fn attr_value(&self, token: &NodeToken, key: &str) -> Option<&str> {
        let attrs = self.attrs.get(&token.id)?;
        let mut found = attrs.iter().filter(|a| a.key == key);
        let first = found.next()?;
        if found.next().is_some() {
            return None;
        }
        Some(&first.value)
    }

    /// Replace a node-token's entire attribute list
    ///
    /// Entries are rewritten to carry the token's id.
    pub fn replace_token_attrs(&mut self, token: &NodeToken, attrs: Vec<TokenAttr>) {
        let attrs = attrs
            .into_iter()
            .map(|mut a| {
                a.attr_set_id = token.id;
                a
            })
            .collect();
        self.attrs.insert(token.id, attrs);
    }

    /// Remove the first node-token equal (by id) to the given one
    pub(crate) fn remove_node_token(&mut self, token: &NodeToken) {
        if let Some(pos) = self.node_tokens.iter().position(|t| t == token) {
            self.node_tokens.remove(pos);
        }
    }

    /// Remove the first arc-token equal (by id) to the given one
    pub(crate) fn remove_arc_token(&mut self, token: &ArcToken) {
        if let Some(pos) = self.arc_tokens.iter().position(|t| t == token) {
            self.arc_tokens.remove(pos);
        }
    }
}
