// vigil-core/src/state_machine.rs
// ============================================================================
// Module: Vigil State Machine
// Description: Incident status graph and the timestamp ledger it drives.
// Purpose: Reject illegal transitions and stamp the `_state_timestamps`
//          ledger on every legal one.
// Dependencies: serde, chrono
// ============================================================================

//! ## Overview
//! The legal transition graph from §4.5 is encoded once, as data, and walked
//! by [`is_legal_transition`]. [`apply_transition`] is the pure `(State,
//! Event) → State` function the design notes call for (§9); the
//! compare-and-swap retry loop that persists the result lives in
//! [`crate::store`], which owns storage details the state machine itself
//! knows nothing about.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::time::Timestamp;

/// The status of an incident's progression through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Alert has produced an incident but triage fields are not yet set.
    Detected,
    /// Triage is running.
    Triaging,
    /// Triage completed with a verdict to investigate.
    Triaged,
    /// The investigator is running.
    Investigating,
    /// The threat hunter is running.
    ThreatHunting,
    /// The commander is building a remediation plan.
    Planning,
    /// A plan action requires approval; the approval gate is polling.
    AwaitingApproval,
    /// The executor is carrying out the plan.
    Executing,
    /// The verifier is checking post-action health.
    Verifying,
    /// Verification failed and the incident is looping back to investigation.
    Reflecting,
    /// Terminal: the incident was resolved.
    Resolved,
    /// Terminal: the incident was escalated to a human.
    Escalated,
    /// Terminal: the incident was suppressed at triage.
    Suppressed,
}

impl IncidentStatus {
    /// Returns true if this status is terminal — no further state edits are
    /// permitted once reached (I3).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Escalated | Self::Suppressed)
    }
}

/// The legal transition graph from §4.5, as `(from, to)` edges.
const LEGAL_TRANSITIONS: &[(IncidentStatus, IncidentStatus)] = &[
    (IncidentStatus::Detected, IncidentStatus::Triaging),
    (IncidentStatus::Triaging, IncidentStatus::Triaged),
    (IncidentStatus::Triaging, IncidentStatus::Suppressed),
    (IncidentStatus::Triaged, IncidentStatus::Investigating),
    (IncidentStatus::Triaged, IncidentStatus::Planning),
    (IncidentStatus::Investigating, IncidentStatus::ThreatHunting),
    (IncidentStatus::Investigating, IncidentStatus::Planning),
    (IncidentStatus::Investigating, IncidentStatus::Escalated),
    (IncidentStatus::ThreatHunting, IncidentStatus::Planning),
    (IncidentStatus::ThreatHunting, IncidentStatus::Escalated),
    (IncidentStatus::Planning, IncidentStatus::AwaitingApproval),
    (IncidentStatus::Planning, IncidentStatus::Executing),
    (IncidentStatus::AwaitingApproval, IncidentStatus::Executing),
    (IncidentStatus::AwaitingApproval, IncidentStatus::Escalated),
    (IncidentStatus::Executing, IncidentStatus::Verifying),
    (IncidentStatus::Executing, IncidentStatus::Escalated),
    (IncidentStatus::Verifying, IncidentStatus::Resolved),
    (IncidentStatus::Verifying, IncidentStatus::Reflecting),
    (IncidentStatus::Verifying, IncidentStatus::Escalated),
    (IncidentStatus::Reflecting, IncidentStatus::Investigating),
];

/// Returns true when `(from, to)` is a legal edge in the §4.5 graph.
#[must_use]
pub fn is_legal_transition(from: IncidentStatus, to: IncidentStatus) -> bool {
    LEGAL_TRANSITIONS.iter().any(|&(edge_from, edge_to)| edge_from == from && edge_to == to)
}

/// Errors raised by the state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    /// The requested edge is not present in the §4.5 transition graph.
    #[error("illegal transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// The status the incident was in.
        from: IncidentStatus,
        /// The status that was rejected.
        to: IncidentStatus,
    },
    /// The incident has already reached a terminal status (I3).
    #[error("incident is terminal at {status:?}; no further state edits are permitted")]
    AlreadyTerminal {
        /// The terminal status the incident is frozen at.
        status: IncidentStatus,
    },
}

/// Ordered ledger of when an incident entered each status (`_state_timestamps`).
pub type StateTimestamps = BTreeMap<IncidentStatus, Timestamp>;

/// Validates and applies a single state transition, returning the stamped
/// ledger entry. Does not touch storage; callers persist the result through
/// [`crate::store::DocumentStore`].
///
/// # Errors
///
/// Returns [`StateMachineError::AlreadyTerminal`] if `from` is terminal, or
/// [`StateMachineError::InvalidTransition`] if `(from, to)` is not a legal
/// edge.
pub fn apply_transition(
    from: IncidentStatus,
    to: IncidentStatus,
    now: Timestamp,
    timestamps: &mut StateTimestamps,
) -> Result<(), StateMachineError> {
    if from.is_terminal() {
        return Err(StateMachineError::AlreadyTerminal { status: from });
    }
    if !is_legal_transition(from, to) {
        return Err(StateMachineError::InvalidTransition { from, to });
    }
    timestamps.insert(to, now);
    Ok(())
}
