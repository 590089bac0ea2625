// vigil-contract/src/payloads.rs
// ============================================================================
// Module: Contract Payloads
// Description: The six typed request/response payload pairs (§4.1).
// Purpose: Replace the source's duck-typed agent calls with closed,
//          serializable shapes the router can validate on the wire.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use vigil_core::identifiers::ActionId;
use vigil_core::identifiers::AlertId;
use vigil_core::identifiers::AssetId;
use vigil_core::identifiers::IncidentId;
use vigil_core::model::Alert;
use vigil_core::model::InvestigationReport;
use vigil_core::model::RemediationPlan;
use vigil_core::model::ThreatScope;
use vigil_core::model::VerificationResult;

// ============================================================================
// SECTION: 1. enrich_and_score / triage
// ============================================================================

/// Request for the triage agent's `enrich_and_score` task (§4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichAndScoreRequest {
    /// The alert to score.
    pub alert: Alert,
}

/// Triage verdict returned by the `enrich_and_score` task (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriageResponse {
    /// Computed priority score, in `[0, 1]`.
    pub priority_score: f64,
    /// Disposition derived from `priority_score` (§4.2).
    pub disposition: vigil_core::scoring::Disposition,
}

// ============================================================================
// SECTION: 2. investigate / investigation report
// ============================================================================

/// Request for the investigator agent's `investigate` task (§4.1, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigateRequest {
    /// Incident under investigation.
    pub incident_id: IncidentId,
    /// 1-based reflection iteration being attempted.
    pub iteration: u32,
    /// The failure analysis from the prior verification attempt, present only
    /// on reflection iterations 2 and 3 (§4.1, §4.8 step 9).
    pub previous_failure_analysis: Option<String>,
}

// `InvestigationReport` (vigil_core::model) is the response payload verbatim.

// ============================================================================
// SECTION: 3. sweep_environment / threat scope
// ============================================================================

/// Request for the threat hunter's `sweep_environment` task (§4.1, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEnvironmentRequest {
    /// Incident driving the sweep.
    pub incident_id: IncidentId,
    /// Assets already implicated, used to seed the sweep.
    pub seed_assets: Vec<AssetId>,
}

// `ThreatScope` (vigil_core::model) is the response payload verbatim.

// ============================================================================
// SECTION: 4. plan_remediation / plan response
// ============================================================================

/// Request for the commander's `plan_remediation` task (§4.1, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRemediationRequest {
    /// Incident the plan is being built for.
    pub incident_id: IncidentId,
    /// The investigation report (and optional threat scope) driving the plan.
    pub investigation_report: InvestigationReport,
    /// Threat scope, present only when the threat hunter ran first.
    pub threat_scope: Option<ThreatScope>,
}

/// Plan response returned by the `plan_remediation` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    /// The assembled remediation plan.
    pub plan: RemediationPlan,
}

// ============================================================================
// SECTION: 5. execute_plan / execution summary
// ============================================================================

/// Request for the executor agent's `execute_plan` task (§4.1, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutePlanRequest {
    /// Incident the plan belongs to.
    pub incident_id: IncidentId,
    /// The plan to execute, already approval-gated.
    pub plan: RemediationPlan,
}

/// Overall outcome of executing a plan's actions (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Every action completed successfully.
    Completed,
    /// At least one action completed and at least one failed.
    PartialFailure,
    /// No action completed successfully.
    Failed,
}

/// Outcome of executing a single plan action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecutionResult {
    /// The action that was executed.
    pub action_id: ActionId,
    /// Whether the action completed successfully.
    pub succeeded: bool,
    /// Error message, present only when `!succeeded`.
    pub error_message: Option<String>,
}

/// Summary returned by the `execute_plan` task (§4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Overall outcome.
    pub status: ExecutionStatus,
    /// Number of actions that completed successfully.
    pub actions_completed: u32,
    /// Number of actions that failed.
    pub actions_failed: u32,
    /// Per-action results, in plan order.
    pub action_results: Vec<ActionExecutionResult>,
}

impl ExecutionSummary {
    /// Derives `status` from the per-action results (§4.1).
    #[must_use]
    pub fn derive_status(action_results: &[ActionExecutionResult]) -> ExecutionStatus {
        let completed = action_results.iter().filter(|r| r.succeeded).count();
        let failed = action_results.len() - completed;
        if failed == 0 {
            ExecutionStatus::Completed
        } else if completed == 0 {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::PartialFailure
        }
    }
}

// ============================================================================
// SECTION: 6. verify_resolution / verification result
// ============================================================================

/// Request for the verifier agent's `verify_resolution` task (§4.1, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResolutionRequest {
    /// Incident being verified.
    pub incident_id: IncidentId,
    /// 1-based reflection iteration this verification belongs to.
    pub iteration: u32,
    /// Success criteria from the executed plan.
    pub success_criteria: Vec<vigil_core::model::SuccessCriterion>,
}

// `VerificationResult` (vigil_core::model) is the response payload verbatim.

// ============================================================================
// SECTION: Alert-watcher trigger (ingestion, not an A2A task; §4.8 step 1)
// ============================================================================

/// The event that starts a coordinator drive loop for one alert (§C11).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTrigger {
    /// The claimed alert.
    pub alert_id: AlertId,
}
