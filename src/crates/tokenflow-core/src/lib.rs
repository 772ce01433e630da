//! # tokenflow-core — Token-Flow Workflow Interpretation
//!
//! A workflow execution engine that interprets directed workflow graphs by
//! advancing typed tokens across nodes and arcs, firing node behavior when
//! activation conditions hold, and persisting every state transition
//! through a pluggable engine backend. Built for long-running business
//! processes: one process instance may hold many tokens at once (parallel
//! branches), join branches back together, and skip or short-circuit nodes
//! under guard control.
//!
//! ## Core Concepts
//!
//! ### Graph
//!
//! An immutable description of nodes and labeled arcs, with per-node
//! input/output arc indices. Exactly one node is the entry node: the node
//! named `"start"` at depth 0. Graphs come from [`graph::GraphBuilder`] or
//! from YAML documents via [`yaml`].
//!
//! ### Tokens
//!
//! Two kinds of token carry process state: a [`token::NodeToken`] is
//! parked at a node (executing or awaiting external input); an
//! [`token::ArcToken`] is in transit along an arc. Node-tokens carry an
//! attribute set — string key/value pairs keyed by token identity.
//!
//! ### Node types
//!
//! Every node names a type in a [`registry::NodeTypeRegistry`]. A type is
//! a *guard* (accept / discard / skip) plus an *accept action* (the
//! node's effect, normally ending in
//! [`interpreter::complete_execution`]). Human-task-like types simply
//! return without completing, leaving the token parked.
//!
//! ### Engine backend
//!
//! The [`engine::Engine`] trait owns persistence: it allocates token
//! identities, installs attribute sets, marks tokens completed, and
//! commits at transaction boundaries. In-memory and durable backends
//! implement the same trait; `tokenflow-memory` ships the reference
//! implementation.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use tokenflow_core::{interpreter, yaml, NodeTypeRegistry};
//! use tokenflow_memory::MemoryEngine;
//!
//! let graph = Arc::new(yaml::load_graph("definitions/review.yaml")?);
//! let registry = Arc::new(NodeTypeRegistry::new());
//! let mut engine = MemoryEngine::new();
//!
//! let process = interpreter::start(&mut engine, registry, graph, json!({}))?;
//! if process.is_complete() {
//!     println!("ran straight through");
//! } else {
//!     // parked tokens are resumed later via interpreter::complete_execution
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`graph`] — nodes, arcs, the indexed graph, and its builder
//! - [`token`] — node-tokens, arc-tokens, token attributes
//! - [`process`] — the mutable state of one running instance
//! - [`registry`] — node-type registry, guards and accept actions
//! - [`engine`] — the backend trait and its error type
//! - [`interpreter`] — the token state machine (the core)
//! - [`yaml`] — workflow definition documents
//! - [`error`] — error taxonomy and the crate `Result`

pub mod engine;
pub mod error;
pub mod graph;
pub mod interpreter;
pub mod process;
pub mod registry;
pub mod token;
pub mod yaml;

pub use engine::{Engine, EngineError, EngineResult};
pub use error::{Result, WorkflowError};
pub use graph::{ArcId, Graph, GraphArc, GraphBuilder, GraphId, Node, NodeId, NodeSource};
pub use process::{Process, ProcessId};
pub use registry::{
    accept_all_guard, default_accept, AcceptFn, GuardFn, GuardResponse, NodeType, NodeTypeRegistry,
};
pub use token::{ArcToken, ArcTokenId, NodeToken, NodeTokenId, TokenAttr};
