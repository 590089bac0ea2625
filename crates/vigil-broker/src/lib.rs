// vigil-broker/src/lib.rs
// ============================================================================
// Crate: vigil-broker
// Description: The A2A router and the tool executor it and agent handlers
//              share (§4.3, §4.7).
// Purpose: Give every agent-to-agent call and every catalog tool query a
//          single, schema-validated, timeout-bounded path.
// Dependencies: vigil-core, vigil-contract, serde, serde_json, thiserror, rand
// ============================================================================

//! ## Overview
//! `vigil-broker` has two responsibilities: [`router::A2aRouter`] dispatches
//! one agent's request to another's registered [`registry::AgentHandler`],
//! enforcing the per-agent timeout table and the retry-once-on-transient
//! policy (§4.7); [`tools::executor::ToolExecutor`] runs the query and
//! search tools a handler declares against the document store, with
//! parameter validation (§4.3). Neither module talks to the network or
//! loads configuration — those concerns live in `vigil-providers` and
//! `vigil-config`, wired together one layer up.

pub mod error;
pub mod registry;
pub mod router;
pub mod tools;

pub use error::AgentError;
pub use error::RouterError;
pub use error::ToolError;
pub use registry::AgentHandler;
pub use registry::HandlerRegistry;
pub use registry::HandlerRegistryBuilder;
pub use registry::DEFAULT_WORKFLOW_TIMEOUT_MS;
pub use registry::SENTINEL_TIMEOUT_MS;
pub use router::A2aRouter;
pub use tools::QueryToolDefinition;
pub use tools::SearchKind;
pub use tools::SearchToolDefinition;
pub use tools::ToolCatalog;
pub use tools::ToolExecutor;
pub use tools::ToolParam;
