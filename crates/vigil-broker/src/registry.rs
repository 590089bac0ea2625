// vigil-broker/src/registry.rs
// ============================================================================
// Module: Agent Handler Registry
// Description: Static registry of agent id -> handler, with per-agent
//              timeouts (§4.7, §9 "Agent card / handler registry").
// Purpose: Give the router a local lookup instead of the runtime reflection
//          the source relies on.
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use vigil_contract::task::Task;
use vigil_core::identifiers::AgentId;

use crate::error::AgentError;

/// Default timeout for an agent id not among the six canonical task handlers
/// (§4.7: "workflow handlers 30-120s"). Chosen as the midpoint of that range;
/// see `DESIGN.md`.
pub const DEFAULT_WORKFLOW_TIMEOUT_MS: u64 = 60_000;

/// Timeout reserved for the operational sentinel agent (§4.7 table). Vigil's
/// coordinator consumes sentinel reports directly (§4.8 step 5) rather than
/// routing through a registered handler, but the constant is kept so a future
/// sentinel handler slots into the same timeout table without a spec change.
pub const SENTINEL_TIMEOUT_MS: u64 = 180_000;

/// A deterministic per-role handler the router can dispatch to (§4.6).
///
/// Handlers operate on already-schema-validated JSON; the router is
/// responsible for serializing/deserializing the caller's typed payload and
/// for validating both directions against the [`Task`]'s schema (§4.1, §7).
pub trait AgentHandler: Send + Sync {
    /// The task this handler answers (used to select request/response
    /// schemas).
    fn task(&self) -> Task;

    /// Executes the handler against an already-validated request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the handler cannot produce a response.
    fn invoke(&self, request: Value) -> Result<Value, AgentError>;
}

/// Builder for a [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: BTreeMap<String, Arc<dyn AgentHandler>>,
    timeouts_ms: BTreeMap<String, u64>,
}

impl HandlerRegistryBuilder {
    /// Registers `handler` under `agent_id`, with an explicit timeout
    /// overriding the task's default (§4.7 table).
    #[must_use]
    pub fn handler(mut self, agent_id: impl Into<String>, handler: impl AgentHandler + 'static, timeout_ms: u64) -> Self {
        let agent_id = agent_id.into();
        self.timeouts_ms.insert(agent_id.clone(), timeout_ms);
        self.handlers.insert(agent_id, Arc::new(handler));
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry { handlers: self.handlers, timeouts_ms: self.timeouts_ms }
    }
}

/// Local registry of agent id -> handler, keyed by agent id (§9).
///
/// A static registry is preferred over runtime reflection: every entry is
/// registered once at startup, by whoever wires the coordinator together.
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn AgentHandler>>,
    timeouts_ms: BTreeMap<String, u64>,
}

impl HandlerRegistry {
    /// Returns a builder for a new registry.
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Looks up the handler registered for `agent_id`.
    #[must_use]
    pub fn resolve(&self, agent_id: &AgentId) -> Option<Arc<dyn AgentHandler>> {
        self.handlers.get(agent_id.as_str()).cloned()
    }

    /// Returns the configured timeout for `agent_id`, falling back to
    /// [`DEFAULT_WORKFLOW_TIMEOUT_MS`] when no explicit timeout was
    /// registered (§4.7: "workflow handlers 30-120s").
    #[must_use]
    pub fn timeout_ms(&self, agent_id: &AgentId) -> u64 {
        self.timeouts_ms.get(agent_id.as_str()).copied().unwrap_or(DEFAULT_WORKFLOW_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;

    use super::*;

    struct EchoHandler;

    impl AgentHandler for EchoHandler {
        fn task(&self) -> Task {
            Task::EnrichAndScore
        }

        fn invoke(&self, request: Value) -> Result<Value, AgentError> {
            Ok(request)
        }
    }

    #[test]
    fn unregistered_agent_resolves_to_none() {
        let registry = HandlerRegistry::builder().build();
        assert!(registry.resolve(&AgentId::new("triage")).is_none());
    }

    #[test]
    fn registered_agent_uses_its_own_timeout() {
        let registry = HandlerRegistry::builder().handler("triage", EchoHandler, 10_000).build();
        assert_eq!(registry.timeout_ms(&AgentId::new("triage")), 10_000);
        assert_eq!(registry.timeout_ms(&AgentId::new("unknown-agent")), DEFAULT_WORKFLOW_TIMEOUT_MS);
        let handler = registry.resolve(&AgentId::new("triage")).expect("must resolve");
        assert_eq!(handler.invoke(json!({"a": 1})).expect("echo cannot fail"), json!({"a": 1}));
    }
}
