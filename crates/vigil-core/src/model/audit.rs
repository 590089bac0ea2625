// vigil-core/src/model/audit.rs
// ============================================================================
// Module: Action Audit Record
// Description: Immutable, write-once record of one executed plan action.
// Purpose: Canonical schema for `vigil-actions-*` documents (§3, §4.6 Executor).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::hashing::HashDigest;
use crate::identifiers::ActionId;
use crate::identifiers::AssetId;
use crate::identifiers::IncidentId;
use crate::time::Timestamp;

/// Terminal outcome of executing one plan action (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The action ran to completion.
    Completed,
    /// The action failed; execution of the plan stops here.
    Failed,
}

/// An immutable, write-once record of one executed plan action (§3).
///
/// Once written, nothing in this struct is ever mutated; a correction is a
/// new record, never an edit (mirrors the incident document's own freeze on
/// terminal state edits, I3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionAuditRecord {
    /// Action identifier, matching the originating plan action.
    pub action_id: ActionId,
    /// Incident this action belongs to.
    pub incident_id: IncidentId,
    /// Agent that carried out the action (always `executor`).
    pub agent_name: String,
    /// Action family.
    pub action_type: String,
    /// System the action targeted.
    pub target_system: String,
    /// Asset the action targeted.
    pub target_asset: AssetId,
    /// When the action began.
    pub started_at: Timestamp,
    /// When the action finished.
    pub completed_at: Timestamp,
    /// Wall-clock duration of the action, in milliseconds.
    pub duration_ms: u64,
    /// Terminal outcome.
    pub execution_status: ExecutionStatus,
    /// Human-readable summary of what happened.
    pub result_summary: String,
    /// Error detail, present only when `execution_status == Failed`.
    pub error_message: Option<String>,
    /// Whether a rollback is available for this action.
    pub rollback_available: bool,
    /// Canonical hash of the action's request payload, for tamper detection.
    pub payload_hash: HashDigest,
}
