//! In-memory engine backend for development and testing
//!
//! [`MemoryEngine`] is the reference implementation of the
//! [`Engine`] trait. All state lives in the [`Process`] value itself;
//! token identities come from monotonically increasing counters, and
//! completion and transaction boundaries are no-ops beyond trace logging.
//! Nothing survives the engine value, which is exactly right for unit and
//! integration tests and for short-lived embedded workflows.
//!
//! **Use it for** tests, prototyping, and processes that never outlive the
//! host. **Avoid it for** anything that must be resumed after a restart —
//! that is what durable backends implementing the same trait are for.
//!
//! # Attribute propagation
//!
//! When a node-token is created from incoming arc-tokens (a join firing,
//! or plain single-arc entry), the new token's attribute set is seeded by
//! copying each incoming token's parent attributes in arrival order,
//! first key wins. Durable backends may choose a different merge policy;
//! the core mandates none.

use std::sync::Arc;

use serde_json::Value;
use tokenflow_core::engine::{Engine, EngineError, EngineResult};
use tokenflow_core::graph::{ArcId, Graph, NodeId};
use tokenflow_core::process::Process;
use tokenflow_core::registry::NodeTypeRegistry;
use tokenflow_core::token::{ArcToken, NodeToken, TokenAttr};

/// Counter-backed [`Engine`] with no persistence
#[derive(Debug, Default)]
pub struct MemoryEngine {
    next_process_id: u64,
    next_node_token_id: u64,
    next_arc_token_id: u64,
}

impl MemoryEngine {
    /// Create an engine with fresh id counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Node-tokens allocated so far (test helper)
    pub fn node_tokens_created(&self) -> u64 {
        self.next_node_token_id
    }

    /// Arc-tokens allocated so far (test helper)
    pub fn arc_tokens_created(&self) -> u64 {
        self.next_arc_token_id
    }
}

impl Engine for MemoryEngine {
    fn create_process(
        &mut self,
        graph: Arc<Graph>,
        registry: Arc<NodeTypeRegistry>,
        user_data: Value,
    ) -> EngineResult<Process> {
        self.next_process_id += 1;
        tracing::trace!(process_id = self.next_process_id, "Process created");
        Ok(Process {
            id: self.next_process_id,
            graph,
            registry,
            node_tokens: Vec::new(),
            arc_tokens: Vec::new(),
            attrs: Default::default(),
            user_data,
        })
    }

    fn create_node_token(
        &mut self,
        process: &mut Process,
        node_id: NodeId,
        incoming: &[ArcToken],
    ) -> EngineResult<NodeToken> {
        self.next_node_token_id += 1;
        let id = self.next_node_token_id;

        let mut attrs: Vec<TokenAttr> = Vec::new();
        for arc_token in incoming {
            let Some(parent_attrs) = process.attrs.get(&arc_token.parent) else {
                continue;
            };
            for attr in parent_attrs {
                if attrs.iter().any(|a| a.key == attr.key) {
                    continue;
                }
                attrs.push(TokenAttr::new(id, attr.key.clone(), attr.value.clone()));
            }
        }
        process.attrs.insert(id, attrs);

        tracing::trace!(token_id = id, node_id, "Node-token created");
        Ok(NodeToken { id, node_id })
    }

    fn create_arc_token(
        &mut self,
        _process: &mut Process,
        arc_id: ArcId,
        parent: &NodeToken,
    ) -> EngineResult<ArcToken> {
        self.next_arc_token_id += 1;
        tracing::trace!(token_id = self.next_arc_token_id, arc_id, "Arc-token created");
        Ok(ArcToken {
            id: self.next_arc_token_id,
            arc_id,
            parent: parent.id,
        })
    }

    fn complete_node_token(&mut self, token: &NodeToken) -> EngineResult<()> {
        tracing::trace!(token_id = token.id, "Node-token completed");
        Ok(())
    }

    fn complete_arc_token(&mut self, token: &ArcToken) -> EngineResult<()> {
        tracing::trace!(token_id = token.id, "Arc-token completed");
        Ok(())
    }

    fn transaction_boundary(&mut self) -> EngineResult<()> {
        tracing::trace!("Transaction boundary");
        Ok(())
    }

    fn set_token_attr(
        &mut self,
        process: &mut Process,
        token: &NodeToken,
        key: &str,
        value: &str,
    ) -> EngineResult<()> {
        let attrs = process
            .attrs
            .get_mut(&token.id)
            .ok_or_else(|| EngineError::NotFound(format!("attribute set for token {}", token.id)))?;
        match attrs.iter_mut().find(|a| a.key == key) {
            Some(attr) => attr.value = value.to_string(),
            None => attrs.push(TokenAttr::new(token.id, key, value)),
        }
        Ok(())
    }

    fn remove_token_attr(
        &mut self,
        process: &mut Process,
        token: &NodeToken,
        key: &str,
    ) -> EngineResult<()> {
        let attrs = process
            .attrs
            .get_mut(&token.id)
            .ok_or_else(|| EngineError::NotFound(format!("attribute set for token {}", token.id)))?;
        attrs.retain(|a| a.key != key);
        Ok(())
    }
}
