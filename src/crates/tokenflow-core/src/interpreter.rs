//! The token state machine: start, accept, join, complete
//!
//! This module is the graph-interpretation loop. It advances tokens across
//! nodes and arcs, dispatches guards and accept actions through the
//! node-type registry, and funnels every state mutation through the
//! [`Engine`] backend.
//!
//! # Token lifecycle
//!
//! ```text
//!  start ──▶ node-token at start node ──▶ accept_with_guard
//!                                              │
//!                 ┌────────────────────────────┼──────────────┐
//!                 ▼ Accept                     ▼ Discard      ▼ Skip(L)
//!            accept action               token completed   complete_execution(L)
//!                 │                                            │
//!                 ▼ complete_execution(L)  ◀──────────────────┘
//!       one arc-token per output arc labeled L, in arc order
//!                 │
//!                 ▼ accept_token
//!        ┌────────┴─────────┐
//!        ▼ non-join         ▼ join
//!   accept_single      accept_join (fires when every input arc
//!        │                  of the label cohort holds a token)
//!        ▼                  │
//!   new node-token ◀────────┘
//!        │
//!        ▼ accept_with_guard  (and so on, strict depth-first)
//! ```
//!
//! # Scheduling model
//!
//! Interpretation is single-threaded and synchronous with respect to one
//! process: a call into [`start`] or [`accept_with_guard`] runs to a
//! quiescent state before returning — no live arc-token that can fire
//! remains, and every remaining node-token is parked awaiting external
//! input. Output arcs of a completing node are traversed in graph order,
//! and each arc's subtree is fully processed before the next arc starts.
//!
//! Execution logically suspends in exactly two places: an accept action
//! that returns without completing (the token stays parked until an
//! external call resumes it, typically via [`complete_execution`]), and a
//! join waiting for more inputs.
//!
//! # Examples
//!
//! ```rust,ignore
//! let registry = Arc::new(NodeTypeRegistry::new());
//! let graph = Arc::new(yaml::load_graph("order-fulfillment.yaml")?);
//! let mut engine = MemoryEngine::new();
//!
//! let process = interpreter::start(&mut engine, registry, graph, json!({"order": 4711}))?;
//! assert!(process.is_complete());
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::engine::Engine;
use crate::error::{Result, WorkflowError};
use crate::graph::Graph;
use crate::process::Process;
use crate::registry::{GuardResponse, NodeTypeRegistry};
use crate::token::{ArcToken, NodeToken};

/// Create a process over the graph and run it to quiescence
///
/// Locates the unique start node, materializes the process through the
/// backend, installs the initial node-token and fires it. Returns the
/// process in whatever state the token movement reached — completed, or
/// holding parked tokens awaiting external input.
///
/// # Errors
///
/// [`WorkflowError::NoStartNode`] / [`WorkflowError::MultipleStartNodes`]
/// when the graph's start predicate is not uniquely satisfied; these are
/// the only recoverable failures, and no process is created. Anything else
/// propagates from the backend or node-type code.
pub fn start(
    engine: &mut dyn Engine,
    registry: Arc<NodeTypeRegistry>,
    graph: Arc<Graph>,
    user_data: Value,
) -> Result<Process> {
    let start_id = graph.start_node()?.id;
    tracing::info!(graph = %graph.name, node_id = start_id, "Starting workflow process");

    let mut process = engine.create_process(Arc::clone(&graph), registry, user_data)?;
    let token = engine.create_node_token(&mut process, start_id, &[])?;
    process.node_tokens.push(token.clone());
    accept_with_guard(engine, &token, &mut process)?;
    Ok(process)
}

/// Fire a node-token that is live and ready at its node
///
/// Looks up the node's type and dispatches on its guard:
///
/// - `Accept` — run the accept action.
/// - `Discard` — complete and drop the token; the accept action never runs.
/// - `Skip(label)` — complete the node along `label` as if its accept
///   action had called [`complete_execution`] with no further effects.
///
/// Also the re-entry point for resuming consideration of a parked token.
pub fn accept_with_guard(
    engine: &mut dyn Engine,
    token: &NodeToken,
    process: &mut Process,
) -> Result<()> {
    let graph = Arc::clone(&process.graph);
    let node = graph
        .node(token.node_id)
        .ok_or(WorkflowError::MissingNode(token.node_id))?;
    let registry = Arc::clone(&process.registry);
    let node_type = registry.node_type(&node.type_name)?;
    let guard = Arc::clone(&node_type.guard);
    let accept = Arc::clone(&node_type.accept);

    match guard(token, process)? {
        GuardResponse::Accept => {
            tracing::trace!(token_id = token.id, node = %node.name, "Guard accepted");
            accept(engine, token, process)
        }
        GuardResponse::Discard => {
            tracing::debug!(token_id = token.id, node = %node.name, "Guard discarded token");
            engine.complete_node_token(token)?;
            process.remove_node_token(token);
            Ok(())
        }
        GuardResponse::Skip(label) => {
            tracing::debug!(token_id = token.id, node = %node.name, label = %label, "Guard skipped node");
            complete_execution(engine, token, &label, process)
        }
    }
}

/// Complete a node and fan out along every output arc matching `label`
///
/// The node-token is completed and removed, then one arc-token is emitted
/// per matching output arc, in the graph's output-arc order. Each
/// arc-token is fully processed — including any joins and subsequent node
/// fires it transitively causes — before the next arc starts. The empty
/// label is legal and matches arcs labeled with the empty string.
pub fn complete_execution(
    engine: &mut dyn Engine,
    token: &NodeToken,
    label: &str,
    process: &mut Process,
) -> Result<()> {
    tracing::debug!(
        token_id = token.id,
        node_id = token.node_id,
        label,
        "Node completed, fanning out"
    );
    engine.complete_node_token(token)?;
    process.remove_node_token(token);

    let graph = Arc::clone(&process.graph);
    for arc in graph.output_arcs(token.node_id) {
        if arc.label != label {
            continue;
        }
        let arc_token = engine.create_arc_token(process, arc.id, token)?;
        accept_token(engine, &arc_token, process)?;
    }
    Ok(())
}

/// Complete a node along the empty label
///
/// Equivalent to [`complete_execution`] with `""`; the default accept
/// action ends with this.
pub fn complete_default_execution(
    engine: &mut dyn Engine,
    token: &NodeToken,
    process: &mut Process,
) -> Result<()> {
    complete_execution(engine, token, "", process)
}

/// Deliver an arc-token to its target node
///
/// Dispatches to [`accept_single`] unless the target node is a join.
pub fn accept_token(
    engine: &mut dyn Engine,
    arc_token: &ArcToken,
    process: &mut Process,
) -> Result<()> {
    let graph = Arc::clone(&process.graph);
    let arc = graph
        .arc(arc_token.arc_id)
        .ok_or(WorkflowError::MissingArc(arc_token.arc_id))?;
    let target = graph
        .node(arc.end_node)
        .ok_or(WorkflowError::MissingNode(arc.end_node))?;
    if target.is_join {
        accept_join(engine, arc_token, process)
    } else {
        accept_single(engine, arc_token, process)
    }
}

/// Consume an arc-token at a non-join node
///
/// Creates a node-token at the target from the single incoming arc-token,
/// completes the arc-token, and fires the new token's guard.
fn accept_single(
    engine: &mut dyn Engine,
    arc_token: &ArcToken,
    process: &mut Process,
) -> Result<()> {
    let graph = Arc::clone(&process.graph);
    let arc = graph
        .arc(arc_token.arc_id)
        .ok_or(WorkflowError::MissingArc(arc_token.arc_id))?;
    tracing::trace!(
        arc_token_id = arc_token.id,
        node_id = arc.end_node,
        "Token entering node"
    );

    let incoming = [arc_token.clone()];
    let token = engine.create_node_token(process, arc.end_node, &incoming)?;
    engine.complete_arc_token(arc_token)?;
    process.node_tokens.insert(0, token.clone());
    accept_with_guard(engine, &token, process)
}

/// Deliver an arc-token to a join node, firing it when its cohort is full
///
/// Joins are partitioned by arc label: the arriving token only considers
/// the target's input arcs carrying the same label. The join fires when
/// every arc of that cohort holds at least one live arc-token; the
/// first-seen token per arc is consumed, surplus tokens and tokens of
/// other labels stay live for subsequent firings. A token arriving at an
/// incomplete cohort is parked in the live list and nothing else changes.
fn accept_join(
    engine: &mut dyn Engine,
    arc_token: &ArcToken,
    process: &mut Process,
) -> Result<()> {
    process.arc_tokens.insert(0, arc_token.clone());

    let graph = Arc::clone(&process.graph);
    let arc = graph
        .arc(arc_token.arc_id)
        .ok_or(WorkflowError::MissingArc(arc_token.arc_id))?;
    let target_id = arc.end_node;

    let mut input_tokens = Vec::new();
    for input_arc in graph.input_arcs(target_id) {
        if input_arc.label != arc.label {
            continue;
        }
        match process.arc_tokens.iter().find(|t| t.arc_id == input_arc.id) {
            Some(found) => input_tokens.push(found.clone()),
            None => {
                tracing::trace!(
                    arc_token_id = arc_token.id,
                    node_id = target_id,
                    waiting_on = input_arc.id,
                    "Join incomplete, token parked"
                );
                return Ok(());
            }
        }
    }

    tracing::debug!(
        node_id = target_id,
        label = %arc.label,
        inputs = input_tokens.len(),
        "Join fired"
    );
    let token = engine.create_node_token(process, target_id, &input_tokens)?;
    for consumed in &input_tokens {
        process.remove_arc_token(consumed);
    }
    for consumed in &input_tokens {
        engine.complete_arc_token(consumed)?;
    }
    process.node_tokens.insert(0, token.clone());
    accept_with_guard(engine, &token, process)
}
