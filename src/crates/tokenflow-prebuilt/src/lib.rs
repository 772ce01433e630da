//! Ready-made node types for tokenflow workflows
//!
//! The core registry ships only `"default"` and `"start"`. This crate adds
//! the node types most deployments reach for next:
//!
//! - [`wait_node_type`] — a human-task node: the accept action parks the
//!   token, and an external caller resumes it later with
//!   [`tokenflow_core::interpreter::complete_execution`] and a chosen
//!   outcome label.
//! - [`gate_node_type`] — a guard driven entirely by the node's extra
//!   payload, for routing decisions authored in the workflow definition
//!   rather than in code:
//!
//! ```yaml
//! - id: 4
//!   type: gate
//!   name: triage
//!   extra: { mode: skip, arc: escalate }
//! ```
//!
//! Install both with [`register_prebuilt`].

use std::sync::Arc;

use serde::Deserialize;
use tokenflow_core::registry::{
    accept_all_guard, default_accept, GuardResponse, NodeType, NodeTypeRegistry,
};
use tokenflow_core::WorkflowError;

/// Type name of the parked human-task node
pub const WAIT_TYPE: &str = "wait";

/// Type name of the payload-driven gate node
pub const GATE_TYPE: &str = "gate";

/// Gate configuration decoded from the node extra payload
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
enum GateMode {
    Accept,
    Discard,
    Skip {
        #[serde(default)]
        arc: String,
    },
}

/// A node type that parks its token until an external completion
///
/// The accept action commits pending state and returns without
/// completing; the token stays live and the process stays incomplete.
/// Resume by calling
/// [`tokenflow_core::interpreter::complete_execution`] at the parked token
/// with the outcome label the task produced.
pub fn wait_node_type() -> NodeType {
    NodeType::new(
        WAIT_TYPE,
        accept_all_guard(),
        Arc::new(|engine, token, _process| {
            // The token may sit here for a long time; make sure everything
            // up to this point is durable before handing off to a human.
            engine.transaction_boundary()?;
            tracing::debug!(
                token_id = token.id,
                node_id = token.node_id,
                "Token parked, awaiting external completion"
            );
            Ok(())
        }),
    )
}

/// A node type whose guard decision is authored in the node extra payload
///
/// The payload must be `{"mode": "accept"}`, `{"mode": "discard"}`, or
/// `{"mode": "skip", "arc": <label>}` (`arc` defaults to the empty
/// label). Any other payload is a node-type domain error.
pub fn gate_node_type() -> NodeType {
    NodeType::new(
        GATE_TYPE,
        Arc::new(|token, process| {
            let node = process.node_for_token(token)?;
            let mode: GateMode = serde_json::from_value(node.extra.clone()).map_err(|e| {
                WorkflowError::node_type(format!(
                    "invalid gate configuration for node {}: {e}",
                    node.id
                ))
            })?;
            Ok(match mode {
                GateMode::Accept => GuardResponse::Accept,
                GateMode::Discard => GuardResponse::Discard,
                GateMode::Skip { arc } => GuardResponse::Skip(arc),
            })
        }),
        default_accept(),
    )
}

/// Register every prebuilt node type
pub fn register_prebuilt(registry: &mut NodeTypeRegistry) {
    registry.register(wait_node_type());
    registry.register(gate_node_type());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tokenflow_core::graph::{Graph, GraphArc, GraphBuilder, Node};
    use tokenflow_core::interpreter;
    use tokenflow_memory::MemoryEngine;

    fn registry() -> Arc<NodeTypeRegistry> {
        let mut registry = NodeTypeRegistry::new();
        register_prebuilt(&mut registry);
        Arc::new(registry)
    }

    fn gate_graph(extra: serde_json::Value) -> Arc<Graph> {
        // start -> gate, then gate fans out "" to done and "escalate" to review
        let graph = GraphBuilder::new(1, "gated")
            .add_node(Node::new(1, "start", "start"))
            .add_node(Node::new(2, "gate", "triage").with_extra(extra))
            .add_node(Node::new(3, "default", "done"))
            .add_node(Node::new(4, "default", "review"))
            .add_arc(GraphArc::new(1, "", 1, 2))
            .add_arc(GraphArc::new(2, "", 2, 3))
            .add_arc(GraphArc::new(3, "escalate", 2, 4))
            .build()
            .unwrap();
        Arc::new(graph)
    }

    #[test]
    fn gate_accept_runs_default_outcome() {
        let mut engine = MemoryEngine::new();
        let process = interpreter::start(
            &mut engine,
            registry(),
            gate_graph(json!({"mode": "accept"})),
            json!({}),
        )
        .unwrap();
        assert!(process.is_complete());
        // start, triage, done — review is never reached
        assert_eq!(engine.node_tokens_created(), 3);
    }

    #[test]
    fn gate_skip_routes_along_named_arc() {
        let mut engine = MemoryEngine::new();
        let process = interpreter::start(
            &mut engine,
            registry(),
            gate_graph(json!({"mode": "skip", "arc": "escalate"})),
            json!({}),
        )
        .unwrap();
        assert!(process.is_complete());
        assert_eq!(engine.node_tokens_created(), 3);
        // the only arc-tokens are start->gate and gate->review
        assert_eq!(engine.arc_tokens_created(), 2);
    }

    #[test]
    fn gate_discard_drops_the_branch() {
        let mut engine = MemoryEngine::new();
        let process = interpreter::start(
            &mut engine,
            registry(),
            gate_graph(json!({"mode": "discard"})),
            json!({}),
        )
        .unwrap();
        assert!(process.is_complete());
        // nothing downstream of the gate ever runs
        assert_eq!(engine.node_tokens_created(), 2);
        assert_eq!(engine.arc_tokens_created(), 1);
    }

    #[test]
    fn gate_rejects_malformed_payload() {
        let mut engine = MemoryEngine::new();
        let err = interpreter::start(
            &mut engine,
            registry(),
            gate_graph(json!({"mode": "sideways"})),
            json!({}),
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::NodeType(_)));
    }

    #[test]
    fn wait_parks_and_resumes() {
        let graph = GraphBuilder::new(1, "approval")
            .add_node(Node::new(1, "start", "start"))
            .add_node(Node::new(2, "wait", "approve"))
            .add_node(Node::new(3, "default", "publish"))
            .add_arc(GraphArc::new(1, "", 1, 2))
            .add_arc(GraphArc::new(2, "", 2, 3))
            .build()
            .unwrap();

        let mut engine = MemoryEngine::new();
        let mut process =
            interpreter::start(&mut engine, registry(), Arc::new(graph), json!({})).unwrap();

        assert!(!process.is_complete());
        assert_eq!(process.node_tokens.len(), 1);
        let parked = process.node_tokens[0].clone();
        assert_eq!(parked.node_id, 2);

        // The human finishes the task; the workflow runs to the end.
        interpreter::complete_execution(&mut engine, &parked, "", &mut process).unwrap();
        assert!(process.is_complete());
    }
}
