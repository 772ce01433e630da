//! YAML-based workflow definitions
//!
//! A [`GraphDef`] is the serde document form of a workflow, loaded from
//! YAML and turned into a validated [`Graph`] through the builder:
//!
//! ```yaml
//! id: 1
//! name: review
//! nodes:
//!   - id: 1
//!     name: start
//!   - id: 2
//!     type: wait
//!     name: approve
//!     extra: { assignee: editors }
//! arcs:
//!   - { from: 1, to: 2 }
//! ```
//!
//! Node `type` defaults to `"default"`, arc `label` to the empty string,
//! and arc ids are assigned automatically when omitted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{ArcId, Graph, GraphArc, GraphBuilder, GraphId, Node, NodeId, NodeSource};

/// Top-level workflow definition document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDef {
    /// Graph id
    #[serde(default)]
    pub id: GraphId,

    /// Workflow name
    pub name: String,

    /// Node definitions
    pub nodes: Vec<NodeDef>,

    /// Arc definitions
    #[serde(default)]
    pub arcs: Vec<ArcDef>,
}

/// Node definition in a workflow document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    /// Unique node id
    pub id: NodeId,

    /// Node-type name
    #[serde(rename = "type", default = "NodeDef::default_type")]
    pub type_name: String,

    /// Display name; `"start"` marks the entry node
    pub name: String,

    /// Origin descriptor
    #[serde(default)]
    pub source: NodeSource,

    /// Whether incoming tokens synchronize here
    #[serde(default)]
    pub is_join: bool,

    /// Free-form per-node configuration
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl NodeDef {
    fn default_type() -> String {
        "default".to_string()
    }
}

/// Arc definition in a workflow document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcDef {
    /// Explicit arc id; assigned automatically when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ArcId>,

    /// Source node id
    pub from: NodeId,

    /// Target node id
    pub to: NodeId,

    /// Outcome label
    #[serde(default)]
    pub label: String,
}

impl GraphDef {
    /// Parse a definition from a YAML document
    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Serialize the definition back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Build the validated graph described by this definition
    ///
    /// Arcs without an explicit id receive ids above the highest explicit
    /// one, in document order.
    pub fn into_graph(self) -> Result<Graph> {
        let mut builder = GraphBuilder::new(self.id, self.name);
        for def in self.nodes {
            let mut node = Node::new(def.id, def.type_name, def.name)
                .with_source(def.source)
                .with_extra(def.extra);
            if def.is_join {
                node = node.with_join();
            }
            builder = builder.add_node(node);
        }
        let mut next_id = self
            .arcs
            .iter()
            .filter_map(|a| a.id)
            .max()
            .unwrap_or(0);
        for def in self.arcs {
            let id = match def.id {
                Some(id) => id,
                None => {
                    next_id += 1;
                    next_id
                }
            };
            builder = builder.add_arc(GraphArc::new(id, def.label, def.from, def.to));
        }
        builder.build()
    }
}

/// Load a workflow definition file and build its graph
pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph> {
    let source = std::fs::read_to_string(path)?;
    GraphDef::from_yaml(&source)?.into_graph()
}
