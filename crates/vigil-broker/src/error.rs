// vigil-broker/src/error.rs
// ============================================================================
// Module: Broker Errors
// Description: Errors raised by the A2A router and the tool executor.
// Purpose: The concrete types behind §7's `AgentTimeoutError`/`A2AError` and
//          the tool executor's `ToolNotFound`/`InvalidDefinition`.
// ============================================================================

use thiserror::Error;
use vigil_contract::ContractValidationError;

/// Errors an [`crate::registry::AgentHandler`] can return from `invoke` (§4.6,
/// §4.7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The handler rejected the request outright (not a transient condition).
    #[error("agent rejected its request: {0}")]
    Rejected(String),
    /// The handler failed; `retryable` mirrors the integration harness's
    /// classification (HTTP 429/5xx, network resets) so the router's
    /// retry-once policy (§4.7) can consult it.
    #[error("agent call failed: {message}")]
    Failed {
        /// Human-readable failure description.
        message: String,
        /// Whether the router should retry this call once.
        retryable: bool,
    },
}

impl AgentError {
    /// Whether the router's retry-once policy (§4.7) applies to this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { retryable: true, .. })
    }
}

/// Errors raised by the A2A router (§4.7, §7).
#[derive(Debug, Error)]
pub enum RouterError {
    /// No handler is registered for the target agent id (telemetry
    /// `card_unavailable`).
    #[error("no handler registered for agent `{0}`")]
    CardUnavailable(String),
    /// The handler exceeded its per-agent timeout (§4.7 table).
    #[error("agent `{agent}` exceeded its {timeout_ms}ms timeout")]
    AgentTimeout {
        /// Agent id that timed out.
        agent: String,
        /// The timeout that was exceeded, in milliseconds.
        timeout_ms: u64,
    },
    /// The call to the handler failed after the retry-once policy was spent.
    #[error("a2a call to `{agent}` failed: {source}")]
    A2A {
        /// Agent id the call targeted.
        agent: String,
        /// The underlying handler error.
        #[source]
        source: AgentError,
    },
    /// The request or response payload failed schema validation (§7).
    #[error(transparent)]
    Contract(#[from] ContractValidationError),
}

/// Errors raised by the tool executor (§4.3).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool with the given name exists in the catalog.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// The tool's catalog definition is malformed (e.g. a placeholder with no
    /// matching parameter declaration).
    #[error("invalid tool definition for `{tool}`: {reason}")]
    InvalidDefinition {
        /// Tool the definition belongs to.
        tool: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A required parameter was not supplied.
    #[error("tool `{tool}` is missing required parameter `{param}`")]
    MissingParameter {
        /// Tool being invoked.
        tool: String,
        /// Parameter name that was missing.
        param: String,
    },
    /// The underlying query against the document store failed.
    #[error("tool `{tool}` query failed: {message}")]
    QueryFailed {
        /// Tool being invoked.
        tool: String,
        /// Failure description.
        message: String,
        /// Whether this failure is a retryable timeout (§4.3).
        retryable: bool,
    },
}

impl ToolError {
    /// Whether this failure should be retried by the caller (§4.3: "query
    /// timeout → retryable error").
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::QueryFailed { retryable: true, .. })
    }
}
