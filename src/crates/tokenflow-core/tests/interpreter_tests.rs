//! End-to-end interpreter scenarios against the in-memory engine
//!
//! These tests drive complete workflows through `start` and verify the
//! token lifecycle, fan-out ordering, join semantics, and guard dispatch
//! that the interpreter guarantees.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokenflow_core::graph::{Graph, GraphArc, GraphBuilder, Node};
use tokenflow_core::interpreter;
use tokenflow_core::registry::{
    accept_all_guard, default_accept, GuardResponse, NodeType, NodeTypeRegistry,
};
use tokenflow_core::{Engine, Process, WorkflowError};
use tokenflow_memory::MemoryEngine;

type SharedLog = Arc<Mutex<Vec<String>>>;

fn new_log() -> SharedLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A node type whose accept records the node name, then completes along ""
fn recording_type(name: &str, log: SharedLog) -> NodeType {
    NodeType::with_default_guard(
        name,
        Arc::new(move |engine, token, process| {
            let node_name = process.node_for_token(token)?.name.clone();
            log.lock().unwrap().push(node_name);
            interpreter::complete_default_execution(engine, token, process)
        }),
    )
}

/// A node type whose accept completes along a fixed label
fn completing_type(name: &str, label: &'static str) -> NodeType {
    NodeType::with_default_guard(
        name,
        Arc::new(move |engine, token, process| {
            interpreter::complete_execution(engine, token, label, process)
        }),
    )
}

/// A node type whose accept parks the token
fn parking_type(name: &str) -> NodeType {
    NodeType::with_default_guard(name, Arc::new(|_engine, _token, _process| Ok(())))
}

/// A node type whose guard discards every token
fn discarding_type(name: &str, log: SharedLog) -> NodeType {
    NodeType::new(
        name,
        Arc::new(|_token, _process| Ok(GuardResponse::Discard)),
        Arc::new(move |engine, token, process| {
            log.lock().unwrap().push("accept ran".to_string());
            interpreter::complete_default_execution(engine, token, process)
        }),
    )
}

fn registry_with(types: Vec<NodeType>) -> Arc<NodeTypeRegistry> {
    let mut registry = NodeTypeRegistry::new();
    for node_type in types {
        registry.register(node_type);
    }
    Arc::new(registry)
}

/// Process invariants that must hold after any completed top-level call
fn assert_invariants(process: &Process) {
    for token in &process.arc_tokens {
        let arc = process.graph.arc(token.arc_id).expect("arc in graph");
        assert!(process.graph.node(arc.start_node).is_some());
        assert!(process.graph.node(arc.end_node).is_some());
    }
    for token in &process.node_tokens {
        assert!(process.graph.node(token.node_id).is_some());
    }
    let mut ids = HashSet::new();
    for token in &process.node_tokens {
        assert!(ids.insert(token.id), "node-token ids must be distinct");
    }
    let mut ids = HashSet::new();
    for token in &process.arc_tokens {
        assert!(ids.insert(token.id), "arc-token ids must be distinct");
    }
    assert_eq!(
        process.is_complete(),
        process.node_tokens.is_empty() && process.arc_tokens.is_empty()
    );
}

#[test]
fn linear_start_to_end() {
    let graph = GraphBuilder::new(1, "linear")
        .add_node(Node::new(1, "start", "start"))
        .add_node(Node::new(2, "default", "end"))
        .add_arc(GraphArc::new(1, "", 1, 2))
        .build()
        .unwrap();

    let mut engine = MemoryEngine::new();
    let process = interpreter::start(
        &mut engine,
        Arc::new(NodeTypeRegistry::new()),
        Arc::new(graph),
        json!({}),
    )
    .unwrap();

    assert!(process.is_complete());
    assert_eq!(engine.node_tokens_created(), 2);
    assert_eq!(engine.arc_tokens_created(), 1);
    assert_invariants(&process);
}

#[test]
fn fan_out_follows_the_completed_label_only() {
    // start completes along "a"; the "b" branch must never run
    let log = new_log();
    let graph = GraphBuilder::new(1, "labeled")
        .add_node(Node::new(1, "to_a", "start"))
        .add_node(Node::new(2, "record", "two"))
        .add_node(Node::new(3, "record", "three"))
        .add_arc(GraphArc::new(1, "a", 1, 2))
        .add_arc(GraphArc::new(2, "b", 1, 3))
        .build()
        .unwrap();

    let mut engine = MemoryEngine::new();
    let process = interpreter::start(
        &mut engine,
        registry_with(vec![
            completing_type("to_a", "a"),
            recording_type("record", log.clone()),
        ]),
        Arc::new(graph),
        json!({}),
    )
    .unwrap();

    assert!(process.is_complete());
    assert_eq!(*log.lock().unwrap(), vec!["two"]);
    assert_eq!(engine.node_tokens_created(), 2);
    assert_invariants(&process);
}

fn split_join_graph() -> Graph {
    GraphBuilder::new(1, "split-join")
        .add_node(Node::new(1, "start", "start"))
        .add_node(Node::new(2, "record", "two"))
        .add_node(Node::new(3, "record", "three"))
        .add_node(Node::new(4, "record", "four").with_join())
        .add_arc(GraphArc::new(1, "", 1, 2))
        .add_arc(GraphArc::new(2, "", 1, 3))
        .add_arc(GraphArc::new(3, "", 2, 4))
        .add_arc(GraphArc::new(4, "", 3, 4))
        .build()
        .unwrap()
}

#[test]
fn parallel_split_joins_once_depth_first() {
    let log = new_log();
    let mut engine = MemoryEngine::new();
    let process = interpreter::start(
        &mut engine,
        registry_with(vec![recording_type("record", log.clone())]),
        Arc::new(split_join_graph()),
        json!({}),
    )
    .unwrap();

    assert!(process.is_complete());
    // Arc order of the start node decides branch order; the join fires
    // exactly once, after the second input arrives.
    assert_eq!(*log.lock().unwrap(), vec!["two", "three", "four"]);
    assert_invariants(&process);
}

#[test]
fn partial_join_does_not_fire() {
    // Branch through node 3 parks, so the join never sees its second input
    let log = new_log();
    let graph = GraphBuilder::new(1, "partial")
        .add_node(Node::new(1, "start", "start"))
        .add_node(Node::new(2, "record", "two"))
        .add_node(Node::new(3, "park", "three"))
        .add_node(Node::new(4, "record", "four").with_join())
        .add_arc(GraphArc::new(1, "", 1, 2))
        .add_arc(GraphArc::new(2, "", 1, 3))
        .add_arc(GraphArc::new(3, "", 2, 4))
        .add_arc(GraphArc::new(4, "", 3, 4))
        .build()
        .unwrap();

    let mut engine = MemoryEngine::new();
    let mut process = interpreter::start(
        &mut engine,
        registry_with(vec![
            recording_type("record", log.clone()),
            parking_type("park"),
        ]),
        Arc::new(graph),
        json!({}),
    )
    .unwrap();

    assert!(!process.is_complete());
    assert_eq!(*log.lock().unwrap(), vec!["two"]);
    // The 2→4 arc-token is pending, 3's token is parked.
    assert_eq!(process.arc_tokens.len(), 1);
    assert_eq!(process.arc_tokens[0].arc_id, 3);
    assert_eq!(process.node_tokens.len(), 1);
    assert_eq!(process.node_tokens[0].node_id, 3);
    assert_invariants(&process);

    // The external world finishes node 3; the join fires and the process
    // runs out.
    let parked = process.node_tokens[0].clone();
    interpreter::complete_execution(&mut engine, &parked, "", &mut process).unwrap();
    assert!(process.is_complete());
    assert_eq!(*log.lock().unwrap(), vec!["two", "four"]);
    assert_invariants(&process);
}

#[test]
fn discard_guard_skips_the_accept_action() {
    let log = new_log();
    let graph = GraphBuilder::new(1, "discarded")
        .add_node(Node::new(1, "start", "start"))
        .add_node(Node::new(2, "reject", "two"))
        .add_arc(GraphArc::new(1, "", 1, 2))
        .build()
        .unwrap();

    let mut engine = MemoryEngine::new();
    let process = interpreter::start(
        &mut engine,
        registry_with(vec![discarding_type("reject", log.clone())]),
        Arc::new(graph),
        json!({}),
    )
    .unwrap();

    assert!(process.is_complete());
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(engine.node_tokens_created(), 2);
    assert_invariants(&process);
}

#[test]
fn join_cohorts_are_partitioned_by_label() {
    // Join node 4 has two "x" inputs and one "y" input; the "x" cohort
    // fires without a "y" token ever existing.
    let log = new_log();
    let graph = GraphBuilder::new(1, "cohorts")
        .add_node(Node::new(1, "start", "start"))
        .add_node(Node::new(2, "to_x", "two"))
        .add_node(Node::new(3, "to_x", "three"))
        .add_node(Node::new(5, "default", "five"))
        .add_node(Node::new(4, "record", "four").with_join())
        .add_arc(GraphArc::new(1, "", 1, 2))
        .add_arc(GraphArc::new(2, "", 1, 3))
        .add_arc(GraphArc::new(3, "x", 2, 4))
        .add_arc(GraphArc::new(4, "x", 3, 4))
        .add_arc(GraphArc::new(5, "y", 5, 4))
        .build()
        .unwrap();

    let mut engine = MemoryEngine::new();
    let process = interpreter::start(
        &mut engine,
        registry_with(vec![
            completing_type("to_x", "x"),
            recording_type("record", log.clone()),
        ]),
        Arc::new(graph),
        json!({}),
    )
    .unwrap();

    assert!(process.is_complete());
    assert_eq!(*log.lock().unwrap(), vec!["four"]);
    assert_invariants(&process);
}

#[test]
fn join_consumes_first_seen_and_keeps_surplus_live() {
    // Start parks so the process stays open while tokens are fed to the
    // join by hand.
    let log = new_log();
    let graph = GraphBuilder::new(1, "surplus")
        .add_node(Node::new(1, "park", "start"))
        .add_node(Node::new(2, "default", "two"))
        .add_node(Node::new(3, "default", "three"))
        .add_node(Node::new(4, "record", "four").with_join())
        .add_arc(GraphArc::new(10, "", 2, 4))
        .add_arc(GraphArc::new(11, "", 3, 4))
        .build()
        .unwrap();

    let mut engine = MemoryEngine::new();
    let mut process = interpreter::start(
        &mut engine,
        registry_with(vec![
            parking_type("park"),
            recording_type("record", log.clone()),
        ]),
        Arc::new(graph),
        json!({}),
    )
    .unwrap();
    let parent = process.node_tokens[0].clone();

    // Two tokens on arc 10, none on arc 11: the join must not fire.
    let t1 = engine.create_arc_token(&mut process, 10, &parent).unwrap();
    interpreter::accept_token(&mut engine, &t1, &mut process).unwrap();
    let t2 = engine.create_arc_token(&mut process, 10, &parent).unwrap();
    interpreter::accept_token(&mut engine, &t2, &mut process).unwrap();
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(process.arc_tokens.len(), 2);
    assert_invariants(&process);

    // A token on arc 11 completes the cohort. The first-seen token on
    // arc 10 in list order is the most recently prepended one; the other
    // stays live as surplus.
    let t3 = engine.create_arc_token(&mut process, 11, &parent).unwrap();
    interpreter::accept_token(&mut engine, &t3, &mut process).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["four"]);
    assert_eq!(process.arc_tokens.len(), 1);
    assert_eq!(process.arc_tokens[0], t1);
    assert!(!process.arc_tokens.contains(&t2));
    assert_invariants(&process);

    // The surplus token participates in the next firing.
    let t4 = engine.create_arc_token(&mut process, 11, &parent).unwrap();
    interpreter::accept_token(&mut engine, &t4, &mut process).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["four", "four"]);
    assert!(process.arc_tokens.is_empty());
    assert_invariants(&process);
}

#[test]
fn parked_arrival_at_a_join_changes_only_the_arc_token_list() {
    let graph = GraphBuilder::new(1, "idle-join")
        .add_node(Node::new(1, "park", "start"))
        .add_node(Node::new(2, "default", "two"))
        .add_node(Node::new(3, "default", "three"))
        .add_node(Node::new(4, "default", "four").with_join())
        .add_arc(GraphArc::new(10, "", 2, 4))
        .add_arc(GraphArc::new(11, "", 3, 4))
        .build()
        .unwrap();

    let mut engine = MemoryEngine::new();
    let mut process = interpreter::start(
        &mut engine,
        registry_with(vec![parking_type("park")]),
        Arc::new(graph),
        json!({}),
    )
    .unwrap();
    let parent = process.node_tokens[0].clone();

    let node_tokens_before = process.node_tokens.clone();
    let attrs_before = process.attrs.clone();

    let t = engine.create_arc_token(&mut process, 10, &parent).unwrap();
    interpreter::accept_token(&mut engine, &t, &mut process).unwrap();

    assert_eq!(process.node_tokens, node_tokens_before);
    assert_eq!(process.attrs, attrs_before);
    assert_eq!(process.arc_tokens, vec![t]);
}

#[test]
fn skip_is_equivalent_to_an_effect_free_accept() {
    let run = |skip: bool| -> (Process, SharedLog, MemoryEngine) {
        let log = new_log();
        let accept_log = log.clone();
        let node_type = if skip {
            NodeType::new(
                "route",
                Arc::new(|_t, _p| Ok(GuardResponse::Skip("go".to_string()))),
                // Must never run under a skipping guard.
                Arc::new(move |engine, token, process| {
                    accept_log.lock().unwrap().push("accept ran".to_string());
                    interpreter::complete_execution(engine, token, "go", process)
                }),
            )
        } else {
            NodeType::new(
                "route",
                accept_all_guard(),
                Arc::new(|engine, token, process| {
                    interpreter::complete_execution(engine, token, "go", process)
                }),
            )
        };

        let graph = GraphBuilder::new(1, "skippable")
            .add_node(Node::new(1, "start", "start"))
            .add_node(Node::new(2, "route", "route"))
            .add_node(Node::new(3, "park", "after"))
            .add_arc(GraphArc::new(1, "", 1, 2))
            .add_arc(GraphArc::new(2, "go", 2, 3))
            .build()
            .unwrap();

        let mut engine = MemoryEngine::new();
        let process = interpreter::start(
            &mut engine,
            registry_with(vec![node_type, parking_type("park")]),
            Arc::new(graph),
            json!({}),
        )
        .unwrap();
        (process, log, engine)
    };

    let (skipped, skip_log, _) = run(true);
    let (accepted, _, _) = run(false);

    assert!(skip_log.lock().unwrap().is_empty());
    // Same live-token shape modulo token identity: one parked token at
    // node 3, no arc-tokens, empty attribute sets.
    assert_eq!(skipped.node_tokens.len(), accepted.node_tokens.len());
    assert_eq!(skipped.node_tokens[0].node_id, accepted.node_tokens[0].node_id);
    assert_eq!(skipped.arc_tokens, accepted.arc_tokens);
    assert_eq!(
        skipped.attrs[&skipped.node_tokens[0].id],
        accepted.attrs[&accepted.node_tokens[0].id]
    );
    assert_invariants(&skipped);
    assert_invariants(&accepted);
}

#[test]
fn default_execution_is_empty_label_execution() {
    let explicit = NodeType::with_default_guard(
        "finish",
        Arc::new(|engine, token, process| {
            interpreter::complete_execution(engine, token, "", process)
        }),
    );
    let default = NodeType::with_default_guard("finish", default_accept());

    for node_type in [explicit, default] {
        let graph = GraphBuilder::new(1, "default-law")
            .add_node(Node::new(1, "finish", "start"))
            .add_node(Node::new(2, "default", "end"))
            .add_arc(GraphArc::new(1, "", 1, 2))
            .build()
            .unwrap();
        let mut engine = MemoryEngine::new();
        let process = interpreter::start(
            &mut engine,
            registry_with(vec![node_type]),
            Arc::new(graph),
            json!({}),
        )
        .unwrap();
        assert!(process.is_complete());
        assert_eq!(engine.node_tokens_created(), 2);
        assert_eq!(engine.arc_tokens_created(), 1);
    }
}

#[test]
fn attributes_flow_to_downstream_tokens() {
    // The start node tags its token; the parked downstream token must have
    // inherited the tag through the arc-token's parent.
    let tagging = NodeType::with_default_guard(
        "tag",
        Arc::new(|engine, token, process| {
            engine.set_token_attr(process, token, "origin", "intake")?;
            interpreter::complete_default_execution(engine, token, process)
        }),
    );

    let graph = GraphBuilder::new(1, "tagged")
        .add_node(Node::new(1, "tag", "start"))
        .add_node(Node::new(2, "park", "task"))
        .add_arc(GraphArc::new(1, "", 1, 2))
        .build()
        .unwrap();

    let mut engine = MemoryEngine::new();
    let process = interpreter::start(
        &mut engine,
        registry_with(vec![tagging, parking_type("park")]),
        Arc::new(graph),
        json!({"case": 17}),
    )
    .unwrap();

    let parked = &process.node_tokens[0];
    assert_eq!(process.attr_value(parked, "origin"), Some("intake"));
    assert_eq!(process.user_data["case"], 17);
    assert_invariants(&process);
}

#[test]
fn start_preconditions_are_the_only_recoverable_errors() {
    let no_start = GraphBuilder::new(1, "no-start")
        .add_node(Node::new(1, "default", "lonely"))
        .build()
        .unwrap();
    let mut engine = MemoryEngine::new();
    let err = interpreter::start(
        &mut engine,
        Arc::new(NodeTypeRegistry::new()),
        Arc::new(no_start),
        json!({}),
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::NoStartNode));
    // No process was created.
    assert_eq!(engine.node_tokens_created(), 0);

    let two_starts = GraphBuilder::new(1, "two-starts")
        .add_node(Node::new(1, "default", "start"))
        .add_node(Node::new(2, "default", "start"))
        .build()
        .unwrap();
    let err = interpreter::start(
        &mut engine,
        Arc::new(NodeTypeRegistry::new()),
        Arc::new(two_starts),
        json!({}),
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::MultipleStartNodes));
}

#[test]
fn unregistered_node_type_is_fatal() {
    let graph = GraphBuilder::new(1, "unknown-type")
        .add_node(Node::new(1, "martian", "start"))
        .build()
        .unwrap();
    let mut engine = MemoryEngine::new();
    let err = interpreter::start(
        &mut engine,
        Arc::new(NodeTypeRegistry::new()),
        Arc::new(graph),
        json!({}),
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::MissingNodeType(name) if name == "martian"));
}

#[test]
fn yaml_definition_runs_to_completion() {
    let doc = r#"
id: 3
name: two-step
nodes:
  - id: 1
    name: start
  - id: 2
    name: end
arcs:
  - { from: 1, to: 2 }
"#;
    let graph = tokenflow_core::yaml::GraphDef::from_yaml(doc)
        .unwrap()
        .into_graph()
        .unwrap();
    let mut engine = MemoryEngine::new();
    let process = interpreter::start(
        &mut engine,
        Arc::new(NodeTypeRegistry::new()),
        Arc::new(graph),
        json!({}),
    )
    .unwrap();
    assert!(process.is_complete());
    assert_invariants(&process);
}
