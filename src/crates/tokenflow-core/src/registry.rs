//! Node-type registry: guard and accept behavior per node type
//!
//! Every node declares a type name; the registry maps that name to a
//! [`NodeType`] — a *guard* deciding whether the node fires, and an
//! *accept* action carrying the node's effect. Behaviors are stored as
//! shared function values ([`GuardFn`], [`AcceptFn`]), so node types can be
//! plain closures:
//!
//! ```rust,ignore
//! let mut registry = NodeTypeRegistry::new();
//! registry.register(NodeType::new(
//!     "notify",
//!     accept_all_guard(),
//!     Arc::new(|engine, token, process| {
//!         send_notification(process.attr_value(token, "recipient"))?;
//!         interpreter::complete_default_execution(engine, token, process)
//!     }),
//! ));
//! ```
//!
//! The registry is read-only after construction and shared by every process
//! interpreting a graph that references it. [`NodeTypeRegistry::new`]
//! registers the built-in `"default"` and `"start"` types; everything else
//! is deployment-specific.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{Result, WorkflowError};
use crate::interpreter;
use crate::process::Process;
use crate::token::NodeToken;

/// Decision returned by a guard when a node-token is ready to fire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardResponse {
    /// Run the node's accept action
    Accept,

    /// Complete and drop the token; the accept action never runs
    Discard,

    /// Complete the node along the named output without running its
    /// accept action
    Skip(String),
}

/// Guard predicate: pure decision over the token and process state
pub type GuardFn = Arc<dyn Fn(&NodeToken, &Process) -> Result<GuardResponse> + Send + Sync>;

/// Accept action: the effectful behavior of a node type
///
/// Typically ends by calling [`interpreter::complete_execution`]; node
/// types modeling human tasks return without completing, leaving the token
/// parked until an external call resumes it.
pub type AcceptFn = Arc<dyn Fn(&mut dyn Engine, &NodeToken, &mut Process) -> Result<()> + Send + Sync>;

/// A guard/accept pair registered under a type name
#[derive(Clone)]
pub struct NodeType {
    /// Registry key
    pub name: String,

    /// Fires when a token is ready at a node of this type
    pub guard: GuardFn,

    /// Runs when the guard accepts
    pub accept: AcceptFn,
}

impl NodeType {
    /// Create a node type from a guard and an accept action
    pub fn new(name: impl Into<String>, guard: GuardFn, accept: AcceptFn) -> Self {
        Self {
            name: name.into(),
            guard,
            accept,
        }
    }

    /// Create a node type that always accepts and runs the given action
    pub fn with_default_guard(name: impl Into<String>, accept: AcceptFn) -> Self {
        Self::new(name, accept_all_guard(), accept)
    }
}

impl std::fmt::Debug for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeType")
            .field("name", &self.name)
            .field("guard", &"<guard fn>")
            .field("accept", &"<accept fn>")
            .finish()
    }
}

/// The guard that accepts unconditionally
pub fn accept_all_guard() -> GuardFn {
    Arc::new(|_token, _process| Ok(GuardResponse::Accept))
}

/// The accept action that immediately completes along the empty label
pub fn default_accept() -> AcceptFn {
    Arc::new(|engine, token, process| {
        interpreter::complete_default_execution(engine, token, process)
    })
}

/// Read-only mapping from type name to [`NodeType`]
pub struct NodeTypeRegistry {
    types: HashMap<String, NodeType>,
}

impl NodeTypeRegistry {
    /// Create a registry with the built-in `"default"` and `"start"` types
    ///
    /// Both accept unconditionally and complete along the empty label.
    pub fn new() -> Self {
        let mut registry = Self {
            types: HashMap::new(),
        };
        registry.register(NodeType::with_default_guard("default", default_accept()));
        registry.register(NodeType::with_default_guard("start", default_accept()));
        registry
    }

    /// Register a node type, replacing any previous entry under the same name
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.name.clone(), node_type);
    }

    /// Look up a node type by name
    pub fn get(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    /// Look up a node type, failing on unknown names
    ///
    /// A graph referencing an unregistered type name is an invariant
    /// violation; the lookup failure is fatal to the invocation.
    pub fn node_type(&self, name: &str) -> Result<&NodeType> {
        self.get(name)
            .ok_or_else(|| WorkflowError::MissingNodeType(name.to_string()))
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("NodeTypeRegistry")
            .field("types", &names)
            .finish()
    }
}
