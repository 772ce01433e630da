//! Workflow graph data structures
//!
//! This module defines the immutable description of a workflow: [`Node`]s,
//! [`GraphArc`]s connecting them, and the [`Graph`] that indexes both.
//! Graphs are assembled through [`GraphBuilder`], which validates the
//! structure once and produces a value that is never mutated afterwards —
//! interpretation only ever reads it.
//!
//! # Graph Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                     Graph                        │
//! │                                                  │
//! │   start ──"":1──▶ ┌────────┐ ──"ok":3──▶ end     │
//! │                   │ review │                     │
//! │                   └────────┘ ──"reject":4──▶ fix │
//! │                                                  │
//! │  Indices: node id → input arcs, output arcs      │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Arc labels are how a node "fans out" on a named outcome: completing a
//! node with label `"ok"` emits a token along every output arc labeled
//! `"ok"`, in the order the arcs were added to the builder.
//!
//! # Examples
//!
//! ```rust
//! use tokenflow_core::graph::{GraphBuilder, GraphArc, Node};
//!
//! let graph = GraphBuilder::new(1, "review")
//!     .add_node(Node::new(1, "start", "start"))
//!     .add_node(Node::new(2, "default", "publish"))
//!     .add_arc(GraphArc::new(1, "", 1, 2))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.output_arcs(1).len(), 1);
//! assert_eq!(graph.start_node().unwrap().id, 1);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

/// Unique node identifier within a graph
pub type NodeId = u64;

/// Unique arc identifier within a graph
pub type ArcId = u64;

/// Unique graph identifier
pub type GraphId = u64;

/// The required name of the unique entry node of every graph
///
/// A node is the start node iff its name equals this literal and its
/// source depth is zero. The label is not configurable.
pub const START_NODE_NAME: &str = "start";

/// Origin descriptor for a node
///
/// Records which workflow definition the node came from. Only the start
/// predicate (`depth == 0`) and sub-workflow bookkeeping consult it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSource {
    /// Name of the workflow definition the node originates from
    #[serde(default)]
    pub workflow: String,

    /// Version of that workflow definition
    #[serde(default)]
    pub version: u32,

    /// Instance label distinguishing repeated imports of the same workflow
    #[serde(default)]
    pub instance: String,

    /// Nesting depth; `0` for top-level nodes
    #[serde(default)]
    pub depth: u32,
}

/// A single node of a workflow graph
///
/// Nodes are immutable once the graph is built. The `type_name` keys into
/// the node-type registry and selects the guard/accept pair that fires when
/// a token reaches the node. The `extra` payload carries free-form per-node
/// configuration; node types decode what they need from it with
/// [`serde_json::from_value`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique id within the graph
    pub id: NodeId,

    /// Key into the node-type registry
    #[serde(rename = "type")]
    pub type_name: String,

    /// Display name; the literal `"start"` at depth 0 marks the entry node
    pub name: String,

    /// Origin descriptor
    #[serde(default)]
    pub source: NodeSource,

    /// Whether incoming tokens synchronize here before the node fires
    #[serde(default)]
    pub is_join: bool,

    /// Free-form per-node configuration
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl Node {
    /// Create a non-join node with an empty source descriptor and no extra
    /// payload
    pub fn new(id: NodeId, type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            name: name.into(),
            source: NodeSource::default(),
            is_join: false,
            extra: serde_json::Value::Null,
        }
    }

    /// Mark the node as a join
    pub fn with_join(mut self) -> Self {
        self.is_join = true;
        self
    }

    /// Attach an extra configuration payload
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }

    /// Replace the source descriptor
    pub fn with_source(mut self, source: NodeSource) -> Self {
        self.source = source;
        self
    }

    /// Whether this node satisfies the start predicate
    pub fn is_start(&self) -> bool {
        self.name == START_NODE_NAME && self.source.depth == 0
    }
}

/// A directed arc between two nodes
///
/// Multiple arcs may share a label; completing a node along a label emits
/// one arc-token per matching output arc. The empty label is legal and is
/// what default execution completes with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphArc {
    /// Unique id within the graph
    pub id: ArcId,

    /// Outcome label; empty string for the default outcome
    #[serde(default)]
    pub label: String,

    /// Id of the node the arc leaves
    pub start_node: NodeId,

    /// Id of the node the arc enters
    pub end_node: NodeId,
}

impl GraphArc {
    /// Create an arc
    pub fn new(id: ArcId, label: impl Into<String>, start_node: NodeId, end_node: NodeId) -> Self {
        Self {
            id,
            label: label.into(),
            start_node,
            end_node,
        }
    }
}

/// Immutable, indexed description of a workflow
///
/// Holds the node set plus two indices: node id → incoming arcs and
/// node id → outgoing arcs. Arc lists preserve the order arcs were added
/// to the builder; the interpreter's fan-out order is exactly the output
/// index order.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Unique graph id
    pub id: GraphId,

    /// Human-readable workflow name
    pub name: String,

    nodes: HashMap<NodeId, Node>,
    arcs: HashMap<ArcId, GraphArc>,
    inputs: HashMap<NodeId, Vec<GraphArc>>,
    outputs: HashMap<NodeId, Vec<GraphArc>>,
}

impl Graph {
    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up an arc by id
    pub fn arc(&self, id: ArcId) -> Option<&GraphArc> {
        self.arcs.get(&id)
    }

    /// Iterate over all nodes (no particular order)
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Arcs entering the given node, in insertion order
    pub fn input_arcs(&self, node: NodeId) -> &[GraphArc] {
        self.inputs.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Arcs leaving the given node, in insertion order
    pub fn output_arcs(&self, node: NodeId) -> &[GraphArc] {
        self.outputs.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The unique entry node of the graph
    ///
    /// # Errors
    ///
    /// [`WorkflowError::NoStartNode`] if no node satisfies the start
    /// predicate, [`WorkflowError::MultipleStartNodes`] if several do.
    pub fn start_node(&self) -> Result<&Node> {
        let mut start = None;
        for node in self.nodes.values() {
            if node.is_start() {
                if start.is_some() {
                    return Err(WorkflowError::MultipleStartNodes);
                }
                start = Some(node);
            }
        }
        start.ok_or(WorkflowError::NoStartNode)
    }
}

/// Builder assembling a validated [`Graph`]
///
/// Collects nodes and arcs, then [`build`](Self::build) indexes them and
/// rejects malformed structure: duplicate node or arc ids and arcs whose
/// endpoints do not resolve to nodes in the graph.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    id: GraphId,
    name: String,
    nodes: Vec<Node>,
    arcs: Vec<GraphArc>,
}

impl GraphBuilder {
    /// Start building a graph with the given id and name
    pub fn new(id: GraphId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: Vec::new(),
            arcs: Vec::new(),
        }
    }

    /// Add a node
    pub fn add_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add an arc
    ///
    /// Arc order is significant: the interpreter traverses a node's output
    /// arcs in the order they were added here.
    pub fn add_arc(mut self, arc: GraphArc) -> Self {
        self.arcs.push(arc);
        self
    }

    /// Index the collected nodes and arcs into a [`Graph`]
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::DuplicateNodeId`] / [`WorkflowError::DuplicateArcId`]
    ///   when ids collide
    /// - [`WorkflowError::UnknownArcEndpoint`] when an arc references a node
    ///   id that was never added
    pub fn build(self) -> Result<Graph> {
        let mut nodes = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes {
            let id = node.id;
            if nodes.insert(id, node).is_some() {
                return Err(WorkflowError::DuplicateNodeId(id));
            }
        }

        let mut arcs = HashMap::with_capacity(self.arcs.len());
        let mut inputs: HashMap<NodeId, Vec<GraphArc>> = HashMap::new();
        let mut outputs: HashMap<NodeId, Vec<GraphArc>> = HashMap::new();
        for arc in self.arcs {
            if !nodes.contains_key(&arc.start_node) {
                return Err(WorkflowError::UnknownArcEndpoint {
                    arc: arc.id,
                    node: arc.start_node,
                });
            }
            if !nodes.contains_key(&arc.end_node) {
                return Err(WorkflowError::UnknownArcEndpoint {
                    arc: arc.id,
                    node: arc.end_node,
                });
            }
            if arcs.insert(arc.id, arc.clone()).is_some() {
                return Err(WorkflowError::DuplicateArcId(arc.id));
            }
            outputs.entry(arc.start_node).or_default().push(arc.clone());
            inputs.entry(arc.end_node).or_default().push(arc);
        }

        Ok(Graph {
            id: self.id,
            name: self.name,
            nodes,
            arcs,
            inputs,
            outputs,
        })
    }
}
