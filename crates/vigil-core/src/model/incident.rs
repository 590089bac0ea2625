// vigil-core/src/model/incident.rs
// ============================================================================
// Module: Incident
// Description: The central, mutable document a coordinator instance owns.
// Purpose: Canonical schema for `vigil-incidents` documents (§3, §6).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AgentId;
use crate::identifiers::AlertId;
use crate::identifiers::IncidentId;
use crate::model::alert::IncidentType;
use crate::model::investigation::InvestigationReport;
use crate::model::plan::RemediationPlan;
use crate::model::verification::VerificationResult;
use crate::scoring::Severity;
use crate::state_machine::IncidentStatus;
use crate::state_machine::StateTimestamps;
use crate::time::Timestamp;

/// Maximum number of reflection iterations before an incident is forced to
/// `escalated` (§4.8 step 9, P2).
pub const MAX_REFLECTION_COUNT: u32 = 3;

/// How an incident reached a terminal state (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionType {
    /// Verification passed without exhausting reflections.
    AutoResolved,
    /// Escalated to a human (rejected approval, exhausted reflections, or a
    /// fatal error).
    Escalated,
    /// Suppressed at triage.
    Suppressed,
}

/// Timing metrics derived from `_state_timestamps` at terminal state (§4.8 step 10).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingMetrics {
    /// Time to detect: `detected` to `triaged`, in seconds.
    pub ttd_seconds: Option<f64>,
    /// Time to investigate: `triaged` to `planning`, in seconds.
    pub tti_seconds: Option<f64>,
    /// Time to remediate: `planning` to the end of `executing`, in seconds.
    pub ttr_seconds: Option<f64>,
    /// Time to verify: end of `executing` to the end of `verifying`, in seconds.
    pub ttv_seconds: Option<f64>,
    /// Total wall-clock duration from `detected` to the terminal state.
    pub total_duration_seconds: Option<f64>,
}

/// The central incident document (§3).
///
/// Owned by exactly one coordinator instance at a time — ownership follows
/// whichever writer holds the most recent `seq_no` (all mutation is
/// compare-and-swap; see [`crate::store::update_with_retry`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Identity, in the `INC-YYYY-XXXXX` shape.
    pub incident_id: IncidentId,
    /// Current pipeline status.
    pub status: IncidentStatus,
    /// `security` or `operational`.
    pub incident_type: IncidentType,
    /// Normalized severity.
    pub severity: Severity,
    /// Priority score from triage (§4.2).
    pub priority_score: f64,
    /// Alerts folded into this incident.
    pub alert_ids: Vec<AlertId>,
    /// Current reflection iteration, `0..=3` (I2, P2).
    pub reflection_count: u32,
    /// Ordered timestamp ledger, one entry per status entered.
    pub state_timestamps: StateTimestamps,
    /// Agents that have touched this incident so far.
    pub agents_involved: Vec<AgentId>,
    /// Most recent investigation report, if any.
    pub investigation_report: Option<InvestigationReport>,
    /// Current remediation plan, if one has been built.
    pub remediation_plan: Option<RemediationPlan>,
    /// History of verification attempts, oldest first.
    pub verification_results: Vec<VerificationResult>,
    /// How the incident reached its terminal state, if it has.
    pub resolution_type: Option<ResolutionType>,
    /// When the incident was created.
    pub created_at: Timestamp,
    /// When the incident was last mutated.
    pub updated_at: Timestamp,
    /// When the incident reached a terminal state, if it has (I4).
    pub resolved_at: Option<Timestamp>,
    /// Timing metrics, computed once the incident reaches a terminal state.
    pub timing_metrics: TimingMetrics,
}

impl Incident {
    /// Creates a freshly detected incident from a triage verdict.
    #[must_use]
    pub fn new_detected(
        incident_id: IncidentId,
        incident_type: IncidentType,
        severity: Severity,
        priority_score: f64,
        alert_id: AlertId,
        now: Timestamp,
    ) -> Self {
        let mut state_timestamps = StateTimestamps::new();
        state_timestamps.insert(IncidentStatus::Detected, now);
        Self {
            incident_id,
            status: IncidentStatus::Detected,
            incident_type,
            severity,
            priority_score,
            alert_ids: vec![alert_id],
            reflection_count: 0,
            state_timestamps,
            agents_involved: Vec::new(),
            investigation_report: None,
            remediation_plan: None,
            verification_results: Vec::new(),
            resolution_type: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            timing_metrics: TimingMetrics::default(),
        }
    }

    /// Whether the incident is frozen against state-field edits (I3).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Records that `agent` participated in this incident, if not already
    /// recorded.
    pub fn record_agent(&mut self, agent: AgentId) {
        if !self.agents_involved.contains(&agent) {
            self.agents_involved.push(agent);
        }
    }

    /// Computes timing metrics from the timestamp ledger (§4.8 step 10). Only
    /// meaningful once the incident has reached a terminal state.
    #[must_use]
    pub fn compute_timing_metrics(&self) -> TimingMetrics {
        let detected = self.state_timestamps.get(&IncidentStatus::Detected).copied();
        let triaged = self.state_timestamps.get(&IncidentStatus::Triaged).copied();
        let planning = self.state_timestamps.get(&IncidentStatus::Planning).copied();
        let executing = self.state_timestamps.get(&IncidentStatus::Executing).copied();
        let verifying = self.state_timestamps.get(&IncidentStatus::Verifying).copied();
        let terminal = self
            .state_timestamps
            .get(&IncidentStatus::Resolved)
            .or_else(|| self.state_timestamps.get(&IncidentStatus::Escalated))
            .or_else(|| self.state_timestamps.get(&IncidentStatus::Suppressed))
            .copied();

        let seconds_between = |start: Option<Timestamp>, end: Option<Timestamp>| {
            match (start, end) {
                (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
                _ => None,
            }
        };

        TimingMetrics {
            ttd_seconds: seconds_between(detected, triaged),
            tti_seconds: seconds_between(triaged, planning),
            ttr_seconds: seconds_between(planning, executing),
            ttv_seconds: seconds_between(executing, verifying),
            total_duration_seconds: seconds_between(detected, terminal),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono::Utc;

    use super::*;

    #[test]
    fn new_detected_stamps_only_the_detected_entry() {
        let now = Utc::now();
        let incident = Incident::new_detected(
            IncidentId::new("INC-2026-00001"),
            IncidentType::Security,
            Severity::High,
            0.91,
            AlertId::new("alert-1"),
            now,
        );
        assert_eq!(incident.state_timestamps.len(), 1);
        assert_eq!(incident.state_timestamps.get(&IncidentStatus::Detected), Some(&now));
        assert!(!incident.is_terminal());
    }

    #[test]
    fn record_agent_does_not_duplicate() {
        let mut incident = Incident::new_detected(
            IncidentId::new("INC-2026-00001"),
            IncidentType::Security,
            Severity::High,
            0.91,
            AlertId::new("alert-1"),
            Utc::now(),
        );
        incident.record_agent(AgentId::new("triage"));
        incident.record_agent(AgentId::new("triage"));
        assert_eq!(incident.agents_involved.len(), 1);
    }

    #[test]
    fn compute_timing_metrics_derives_durations_from_ledger() {
        let mut incident = Incident::new_detected(
            IncidentId::new("INC-2026-00001"),
            IncidentType::Security,
            Severity::High,
            0.91,
            AlertId::new("alert-1"),
            Utc::now(),
        );
        let start = incident.state_timestamps[&IncidentStatus::Detected];
        incident.state_timestamps.insert(IncidentStatus::Triaged, start + Duration::seconds(5));
        incident.state_timestamps.insert(IncidentStatus::Resolved, start + Duration::seconds(65));

        let metrics = incident.compute_timing_metrics();
        assert_eq!(metrics.ttd_seconds, Some(5.0));
        assert_eq!(metrics.total_duration_seconds, Some(65.0));
    }
}
