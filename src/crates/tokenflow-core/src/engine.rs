//! Engine backend trait for pluggable state persistence
//!
//! This module defines the **[`Engine`]** trait — the abstraction every
//! persistence backend implements. All state-mutating operations of the
//! interpreter flow through it: token creation and completion, attribute
//! writes, and transaction boundaries. The interpreter never mutates
//! persistent state directly, so swapping an in-memory backend for a
//! durable one changes nothing above this trait.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Interpreter                                 │
//! │  • start / accept / complete token movement  │
//! └──────────────┬───────────────────────────────┘
//!                │ Engine trait
//!                ↓
//! ┌──────────────────────────────────────────────┐
//! │  Backend (your implementation)               │
//! │  • in-memory counters (tokenflow-memory)     │
//! │  • database sequences + rows (durable)       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Contract
//!
//! - Token identities are allocated by the backend and must be unique for
//!   the lifetime of a process.
//! - `create_node_token` installs the new token's entry in the process
//!   attribute map and may seed it from the incoming arc-tokens' parents;
//!   the merge policy is the backend's, not the core's.
//! - `transaction_boundary` durably commits pending work. Its placement is
//!   policy of node-type code — the interpreter never calls it.
//! - Any failure aborts the current interpreter invocation; the backend
//!   owns rollback semantics at its next boundary. The core performs no
//!   retries.
//!
//! # Implementing a backend
//!
//! ```rust,ignore
//! struct PgEngine { conn: Client, }
//!
//! impl Engine for PgEngine {
//!     fn create_node_token(
//!         &mut self,
//!         process: &mut Process,
//!         node_id: NodeId,
//!         incoming: &[ArcToken],
//!     ) -> EngineResult<NodeToken> {
//!         let id = self.next_from_sequence("node_token_ids")?;
//!         self.conn.execute(
//!             "INSERT INTO node_token (id, process_id, node_id) VALUES ($1, $2, $3)",
//!             &[&id, &process.id, &node_id],
//!         )?;
//!         process.attrs.insert(id, self.seed_attrs(process, id, incoming)?);
//!         Ok(NodeToken { id, node_id })
//!     }
//!     // ...
//! }
//! ```

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::graph::{ArcId, Graph, NodeId};
use crate::process::Process;
use crate::registry::NodeTypeRegistry;
use crate::token::{ArcToken, NodeToken};

/// Result type for backend operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors raised by engine backends
#[derive(Error, Debug)]
pub enum EngineError {
    /// Underlying storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A referenced record does not exist in the backend
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted state failed to encode or decode
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific error
    #[error("{0}")]
    Custom(String),
}

/// Persistence backend for process state transitions
///
/// Implementations range from no-op in-memory persistence to durable
/// relational storage. Backends are responsible for their own concurrency
/// control; the interpreter serializes access to one process within a
/// single invocation.
pub trait Engine {
    /// Materialize a new process over the given graph and registry
    fn create_process(
        &mut self,
        graph: Arc<Graph>,
        registry: Arc<NodeTypeRegistry>,
        user_data: Value,
    ) -> EngineResult<Process>;

    /// Allocate a node-token at `node_id`
    ///
    /// Installs the token's entry in the process attribute map; may
    /// initialize attributes from the `incoming` tokens' parents. Does not
    /// touch the live token lists — list membership is the interpreter's.
    fn create_node_token(
        &mut self,
        process: &mut Process,
        node_id: NodeId,
        incoming: &[ArcToken],
    ) -> EngineResult<NodeToken>;

    /// Allocate an arc-token on `arc_id`, produced by `parent`
    fn create_arc_token(
        &mut self,
        process: &mut Process,
        arc_id: ArcId,
        parent: &NodeToken,
    ) -> EngineResult<ArcToken>;

    /// Mark a node-token completed, removing it from persistence
    fn complete_node_token(&mut self, token: &NodeToken) -> EngineResult<()>;

    /// Mark an arc-token completed, removing it from persistence
    fn complete_arc_token(&mut self, token: &ArcToken) -> EngineResult<()>;

    /// Flush pending work and commit
    ///
    /// Called by node-type accept actions when they wish to bound
    /// atomicity; never called by the interpreter.
    fn transaction_boundary(&mut self) -> EngineResult<()>;

    /// Set one attribute of a node-token, replacing any prior value for
    /// the key
    fn set_token_attr(
        &mut self,
        process: &mut Process,
        token: &NodeToken,
        key: &str,
        value: &str,
    ) -> EngineResult<()>;

    /// Remove one attribute of a node-token, if present
    fn remove_token_attr(
        &mut self,
        process: &mut Process,
        token: &NodeToken,
        key: &str,
    ) -> EngineResult<()>;
}
