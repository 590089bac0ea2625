// vigil-agents/src/executor.rs
// ============================================================================
// Module: Executor Handler
// Description: Deterministic `execute_plan` agent handler (§4.6 Executor).
// Purpose: Walk a plan's actions in order, dispatching each to the matching
//          integration adapter, writing an immutable audit record per
//          outcome, and stopping at the first failure.
// ============================================================================

//! ## Overview
//! Every action the commander emits already cleared the approval gate before
//! this handler ever sees it: [`vigil_contract::payloads::ExecutePlanRequest`]
//! documents its `plan` field as "already approval-gated", so the executor
//! itself never calls into the approval gate (§4.9 owns that step, and it
//! runs inside the coordinator's drive loop before `execute_plan` is
//! dispatched at all). The executor's only job is dispatch, audit, and
//! first-failure stop.
//!
//! Dispatch is keyed on [`vigil_core::model::PlanAction::target_system`]
//! against the adapters [`vigil_providers::suite::IntegrationSuite`] wires
//! up; an action whose `target_system` names no known integration (chiefly
//! `Documentation` actions, which have no external system to call) is
//! recorded as having succeeded internally without an outbound call. Every
//! adapter call shares the harness's single retry/breaker/timeout policy
//! (§4.4): the per-attempt deadline is the HTTP client timeout fixed once at
//! [`IntegrationSuite::from_config`] time, not a distinct deadline per action
//! type, since the harness has no mechanism to preempt a call already in
//! flight with a second, type-specific deadline.

use std::sync::Arc;

use serde_json::Value;
use vigil_broker::AgentError;
use vigil_broker::AgentHandler;
use vigil_contract::payloads::ActionExecutionResult;
use vigil_contract::payloads::ExecutePlanRequest;
use vigil_contract::payloads::ExecutionSummary;
use vigil_contract::task::Task;
use vigil_core::hashing::hash_canonical_json;
use vigil_core::hashing::DEFAULT_HASH_ALGORITHM;
use vigil_core::identifiers::IncidentId;
use vigil_core::model::audit::ActionAuditRecord;
use vigil_core::model::audit::ExecutionStatus as AuditExecutionStatus;
use vigil_core::model::PlanAction;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;
use vigil_providers::error::IntegrationError;
use vigil_providers::harness::IntegrationHarness;
use vigil_providers::harness::RetryConfig;
use vigil_providers::suite::IntegrationSuite;

const ACTIONS_INDEX: &str = "vigil-actions-runtime";

/// Agent name recorded on every audit record this handler writes.
const AGENT_NAME: &str = "executor";

/// The `execute_plan` / executor agent handler (§4.6 Executor).
pub struct ExecutorHandler {
    suite: Arc<IntegrationSuite>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    retry: RetryConfig,
}

impl ExecutorHandler {
    /// Builds an executor handler over the given integration suite.
    #[must_use]
    pub fn new(suite: Arc<IntegrationSuite>, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, retry: RetryConfig) -> Self {
        Self { suite, store, clock, retry }
    }

    fn execute(&self, incident_id: &IncidentId, actions: &[PlanAction]) -> Vec<ActionExecutionResult> {
        let harness = IntegrationHarness::new(self.retry, &self.suite.breaker, self.clock.as_ref());
        let mut results = Vec::with_capacity(actions.len());

        for action in actions {
            let started_at = self.clock.now();
            let outcome = dispatch_action(&self.suite, &harness, incident_id, action);
            let completed_at = self.clock.now();
            let duration_ms = u64::try_from((completed_at - started_at).num_milliseconds()).unwrap_or(0);

            let (succeeded, result_summary, error_message) = match &outcome {
                Ok(summary) => (true, summary.clone(), None),
                Err(err) => (false, format!("{} dispatch failed", action.target_system), Some(err.to_string())),
            };

            self.record_audit(incident_id, action, started_at, completed_at, duration_ms, succeeded, &result_summary, error_message.as_deref());

            results.push(ActionExecutionResult {
                action_id: action.action_id.clone(),
                succeeded,
                error_message,
            });

            if !succeeded {
                break;
            }
        }

        results
    }

    fn record_audit(
        &self,
        incident_id: &IncidentId,
        action: &PlanAction,
        started_at: vigil_core::time::Timestamp,
        completed_at: vigil_core::time::Timestamp,
        duration_ms: u64,
        succeeded: bool,
        result_summary: &str,
        error_message: Option<&str>,
    ) {
        let payload_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, action).unwrap_or_else(|_| {
            vigil_core::hashing::hash_bytes(DEFAULT_HASH_ALGORITHM, action.description.as_bytes())
        });
        let record = ActionAuditRecord {
            action_id: action.action_id.clone(),
            incident_id: incident_id.clone(),
            agent_name: AGENT_NAME.to_string(),
            action_type: action_type_label(action.action_type).to_string(),
            target_system: action.target_system.clone(),
            target_asset: action.target_asset.clone(),
            started_at,
            completed_at,
            duration_ms,
            execution_status: if succeeded { AuditExecutionStatus::Completed } else { AuditExecutionStatus::Failed },
            result_summary: result_summary.to_string(),
            error_message: error_message.map(str::to_string),
            rollback_available: !action.rollback.is_empty(),
            payload_hash,
        };
        let _ = self.store.index(ACTIONS_INDEX, Some(action.action_id.as_str()), serde_json::to_value(&record).unwrap_or(Value::Null));
    }
}

fn action_type_label(action_type: vigil_core::model::ActionType) -> &'static str {
    match action_type {
        vigil_core::model::ActionType::Containment => "containment",
        vigil_core::model::ActionType::Remediation => "remediation",
        vigil_core::model::ActionType::Communication => "communication",
        vigil_core::model::ActionType::Documentation => "documentation",
    }
}

fn dispatch_action(
    suite: &IntegrationSuite,
    harness: &IntegrationHarness<'_>,
    incident_id: &IncidentId,
    action: &PlanAction,
) -> Result<String, IntegrationError> {
    match action.target_system.as_str() {
        "firewall" => suite.firewall.block(harness, action.target_asset.as_str()).map(|outcome| match outcome {
            vigil_providers::firewall::BlockOutcome::Blocked(rule) => format!("firewall rule {} created", rule.rule_id),
            vigil_providers::firewall::BlockOutcome::Mocked(receipt) => format!("mock: {}", receipt.intended_effect),
        }),
        "identity" => suite.identity.suspend(harness, action.target_asset.as_str()).map(|outcome| match outcome {
            vigil_providers::identity::SuspensionOutcome::Changed { login } => format!("account {login} suspended"),
            vigil_providers::identity::SuspensionOutcome::Mocked(receipt) => format!("mock: {}", receipt.intended_effect),
        }),
        "container-orchestrator" => suite.container.restart(harness, action.target_asset.as_str()).map(|outcome| match outcome {
            vigil_providers::container::OrchestratorOutcome::Applied => format!("deployment {} restarted", action.target_asset),
            vigil_providers::container::OrchestratorOutcome::Mocked(receipt) => format!("mock: {}", receipt.intended_effect),
        }),
        "chat" => suite.chat.post_notification(harness, &action.description).map(|outcome| match outcome {
            vigil_providers::chat::ChatPostOutcome::Delivered { channels } => format!("posted to {}", channels.join(", ")),
            vigil_providers::chat::ChatPostOutcome::Mocked(receipt) => format!("mock: {}", receipt.intended_effect),
        }),
        "ticketing" => suite.ticketing.create_incident_ticket(harness, incident_id.as_str(), &action.description).map(|outcome| match outcome {
            vigil_providers::ticketing::TicketOutcome::Ticket(ticket_ref) => format!("ticket {} filed", ticket_ref.ticket_id),
            vigil_providers::ticketing::TicketOutcome::Mocked(receipt) => format!("mock: {}", receipt.intended_effect),
        }),
        "paging" => suite.paging.trigger(harness, incident_id.as_str(), &action.description).map(|outcome| match outcome {
            vigil_providers::paging::PagingOutcome::Acked { dedup_key } => format!("page triggered under {dedup_key}"),
            vigil_providers::paging::PagingOutcome::Mocked(receipt) => format!("mock: {}", receipt.intended_effect),
        }),
        other => Ok(format!("recorded internally; no integration named `{other}`")),
    }
}

impl AgentHandler for ExecutorHandler {
    fn task(&self) -> Task {
        Task::ExecutePlan
    }

    fn invoke(&self, request: Value) -> Result<Value, AgentError> {
        let request: ExecutePlanRequest = serde_json::from_value(request)
            .map_err(|err| AgentError::Rejected(format!("malformed execute_plan request: {err}")))?;

        let action_results = self.execute(&request.incident_id, &request.plan.actions);
        let actions_completed = u32::try_from(action_results.iter().filter(|r| r.succeeded).count()).unwrap_or(u32::MAX);
        let actions_failed = u32::try_from(action_results.iter().filter(|r| !r.succeeded).count()).unwrap_or(u32::MAX);
        let status = ExecutionSummary::derive_status(&action_results);

        let summary = ExecutionSummary { status, actions_completed, actions_failed, action_results };
        serde_json::to_value(summary).map_err(|err| AgentError::Rejected(format!("failed to serialize execution summary: {err}")))
    }
}
