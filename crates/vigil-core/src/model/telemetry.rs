// vigil-core/src/model/telemetry.rs
// ============================================================================
// Module: Agent Telemetry
// Description: Per-A2A-call telemetry record.
// Purpose: Canonical schema for `vigil-agent-telemetry` documents (§3, §4.7).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AgentId;
use crate::identifiers::CorrelationId;
use crate::time::Timestamp;

/// Outcome of one A2A router call (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryStatus {
    /// The handler responded within its timeout with a valid payload.
    Success,
    /// The handler exceeded its per-agent timeout (§4.7).
    Timeout,
    /// The handler returned an error, or its response failed validation.
    Error,
    /// The target handler was not registered in the router.
    CardUnavailable,
    /// The handler succeeded using a locally-computed fallback.
    SuccessLocal,
}

/// Telemetry emitted for every A2A call, success or failure (§3, §4.7).
///
/// Recording telemetry is best-effort: a failure to write this record is
/// never surfaced to the caller (§7 Propagation policy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTelemetry {
    /// When the call was recorded.
    pub timestamp: Timestamp,
    /// Caller agent id.
    pub from_agent: AgentId,
    /// Callee agent id.
    pub to_agent: AgentId,
    /// Correlation id, equal to the owning incident id (or alert id pre-incident).
    pub correlation_id: CorrelationId,
    /// The task/payload tag dispatched (e.g. `enrich_and_score`).
    pub task: String,
    /// Wall-clock time the call took, in milliseconds.
    pub execution_time_ms: u64,
    /// Outcome of the call.
    pub status: TelemetryStatus,
}
