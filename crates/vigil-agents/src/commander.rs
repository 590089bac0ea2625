// vigil-agents/src/commander.rs
// ============================================================================
// Module: Commander Handler
// Description: Deterministic `plan_remediation` agent handler (§4.6
//              Commander).
// Purpose: Turn an investigation report, optional threat scope, and matched
//          runbooks into one ordered, deduplicated remediation plan.
// ============================================================================

//! ## Overview
//! The commander is specified as a pure function over its inputs, so
//! [`CommanderHandler::build_plan`] never returns an error: any internal
//! failure (an unreadable incident document, no runbook match, a malformed
//! runbook step) degrades to the single-action fallback plan rather than
//! propagating to the A2A router (§4.6: "never throw out to orchestrator").
//! The only tool calls the commander makes are read-only: matching runbooks,
//! asset criticality, and current service metrics.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use vigil_broker::tools::ToolCatalog;
use vigil_broker::tools::ToolExecutor;
use vigil_broker::AgentError;
use vigil_broker::AgentHandler;
use vigil_contract::payloads::PlanRemediationRequest;
use vigil_contract::payloads::PlanResponse;
use vigil_contract::task::Task;
use vigil_core::identifiers::ActionId;
use vigil_core::identifiers::AssetId;
use vigil_core::model::incident::Incident;
use vigil_core::model::ActionType;
use vigil_core::model::ComparisonOperator;
use vigil_core::model::PlanAction;
use vigil_core::model::RemediationPlan;
use vigil_core::model::Runbook;
use vigil_core::model::SuccessCriterion;
use vigil_core::scoring::AssetCriticality;
use vigil_core::scoring::Severity;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;

const INCIDENTS_INDEX: &str = "vigil-incidents";
const RUNBOOKS_INDEX: &str = "vigil-runbooks";

/// Query tool ranking candidate runbooks for an incident type (§4.6: "runbook
/// matches"); the handler treats the first row as top-ranked.
pub const TOOL_RUNBOOK_MATCH: &str = "runbook_match";
/// Query tool returning an asset's criticality tier, shared with the triage
/// tool of the same purpose but declared per-handler since catalogs are not
/// shared across agents.
pub const TOOL_ASSET_CRITICALITY: &str = "asset_criticality";
/// Query tool returning a service's current latency, for the `derive` rule.
pub const TOOL_CURRENT_METRICS: &str = "current_metrics";

const DEFAULT_AVG_LATENCY_MS: f64 = 200.0;
const GATEWAY_AVG_LATENCY_MS: f64 = 150.0;
const DATABASE_AVG_LATENCY_MS: f64 = 50.0;
const MIN_DERIVED_LATENCY_MS: f64 = 10.0;
const MAX_DERIVED_LATENCY_MS: f64 = 500.0;
const DERIVED_LATENCY_FRACTION: f64 = 0.3;

const CONTAINMENT_KEYWORDS: &[&str] = &["isolat", "block", "quarantine", "contain", "firewall"];
const COMMUNICATION_KEYWORDS: &[&str] = &["notify", "alert", "inform", "post ", "communicat", "escalat"];
const DOCUMENTATION_KEYWORDS: &[&str] = &["document", "record the", "log the incident", "write up", "postmortem"];

/// The `plan_remediation` / commander agent handler (§4.6 Commander).
pub struct CommanderHandler {
    catalog: ToolCatalog,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl CommanderHandler {
    /// Builds a commander handler over `catalog`'s runbook and metrics tools.
    #[must_use]
    pub fn new(catalog: ToolCatalog, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, store, clock }
    }

    fn build_plan(&self, request: &PlanRemediationRequest) -> RemediationPlan {
        let executor = ToolExecutor::new(&self.catalog, self.store.as_ref(), self.clock.as_ref());
        let severity = self.load_severity(request.incident_id.as_str());
        let runbooks = self.matched_runbooks(&executor, &request.investigation_report.incident_id);

        if runbooks.is_empty() {
            return fallback_plan();
        }

        let mut actions = merge_runbooks(&runbooks, request.incident_id.as_str());
        dedup_actions(&mut actions);
        order_actions(&mut actions, request.incident_id.as_str());
        apply_approval_rules(&mut actions, severity, &executor);

        let requires_approval = actions.iter().any(|action| action.approval_required);
        let success_criteria = derive_success_criteria(&actions, &executor);

        RemediationPlan {
            actions,
            success_criteria,
            requires_approval,
            runbook_used: runbooks.first().map(|runbook| runbook.runbook_id.clone()),
        }
    }

    fn load_severity(&self, incident_id: &str) -> Option<Severity> {
        let document = self.store.get(INCIDENTS_INDEX, incident_id).ok()?;
        let incident: Incident = serde_json::from_value(document.source).ok()?;
        Some(incident.severity)
    }

    fn matched_runbooks(&self, executor: &ToolExecutor<'_>, incident_id: &vigil_core::identifiers::IncidentId) -> Vec<Runbook> {
        let mut params = BTreeMap::new();
        params.insert("incident_id".to_string(), Value::from(incident_id.as_str()));
        let Ok(result) = executor.run_query(TOOL_RUNBOOK_MATCH, &params) else {
            return Vec::new();
        };
        let Some(column) = result.columns.iter().position(|c| c == "runbook_id") else {
            return Vec::new();
        };

        result
            .values
            .iter()
            .filter_map(|row| row.get(column)?.as_str())
            .filter_map(|runbook_id| self.store.get(RUNBOOKS_INDEX, runbook_id).ok())
            .filter_map(|document| serde_json::from_value::<Runbook>(document.source).ok())
            .collect()
    }
}

fn fallback_plan() -> RemediationPlan {
    RemediationPlan {
        actions: vec![PlanAction {
            action_id: ActionId::new("ACT-fallback-escalation"),
            order: 1,
            action_type: ActionType::Communication,
            description: "describe_escalation".to_string(),
            target_system: "chat".to_string(),
            target_asset: AssetId::new("unassigned"),
            approval_required: false,
            rollback: Vec::new(),
        }],
        success_criteria: Vec::new(),
        requires_approval: false,
        runbook_used: None,
    }
}

fn classify(description: &str) -> ActionType {
    let lowered = description.to_ascii_lowercase();
    if COMMUNICATION_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        ActionType::Communication
    } else if DOCUMENTATION_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        ActionType::Documentation
    } else if CONTAINMENT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        ActionType::Containment
    } else {
        ActionType::Remediation
    }
}

fn merge_runbooks(runbooks: &[Runbook], incident_id: &str) -> Vec<PlanAction> {
    let mut covered: BTreeSet<(ActionType, String, AssetId)> = BTreeSet::new();
    let mut actions = Vec::new();
    let mut index = 0usize;

    for (rank, runbook) in runbooks.iter().enumerate() {
        for step in &runbook.steps {
            let action_type = classify(&step.description);
            let key = (action_type, step.target_system.clone(), step.target_asset.clone());
            if rank > 0 && covered.contains(&key) {
                continue;
            }
            covered.insert(key);
            index += 1;
            actions.push(PlanAction {
                action_id: ActionId::new(format!("ACT-{incident_id}-{index:03}")),
                order: 0,
                action_type,
                description: step.description.clone(),
                target_system: step.target_system.clone(),
                target_asset: step.target_asset.clone(),
                approval_required: step.approval_required,
                rollback: step.rollback.clone(),
            });
        }
    }
    actions
}

fn dedup_actions(actions: &mut Vec<PlanAction>) {
    let mut seen = BTreeSet::new();
    actions.retain(|action| seen.insert(action.dedup_key()));
}

fn order_actions(actions: &mut [PlanAction], incident_id: &str) {
    actions.sort_by_key(|action| action.action_type.order_rank());
    for (index, action) in actions.iter_mut().enumerate() {
        action.order = u32::try_from(index + 1).unwrap_or(u32::MAX);
        action.action_id = ActionId::new(format!("ACT-{incident_id}-{:03}", index + 1));
    }
}

fn apply_approval_rules(actions: &mut [PlanAction], severity: Option<Severity>, executor: &ToolExecutor<'_>) {
    for action in actions.iter_mut() {
        let mut requires = action.approval_required;

        if action.action_type == ActionType::Containment {
            let lowered = action.description.to_ascii_lowercase();
            requires |= lowered.contains("isolat") || lowered.contains("firewall") || lowered.contains("block");
        }
        if action.action_type == ActionType::Remediation {
            requires |= action.rollback.iter().any(|step| step.target_system == "container-orchestrator");
        }
        requires |= action.target_system == "identity" && action.description.to_ascii_lowercase().contains("suspend");
        if severity == Some(Severity::Critical) {
            requires |= asset_tier(executor, action.target_asset.as_str()) == AssetCriticality::Tier1;
        }

        action.approval_required = requires;
    }
}

fn asset_tier(executor: &ToolExecutor<'_>, asset_id: &str) -> AssetCriticality {
    let mut params = BTreeMap::new();
    params.insert("asset_id".to_string(), Value::from(asset_id));
    executor
        .run_query(TOOL_ASSET_CRITICALITY, &params)
        .ok()
        .and_then(|result| {
            let index = result.columns.iter().position(|c| c == "criticality")?;
            result.values.first()?.get(index)?.as_str().map(AssetCriticality::parse)
        })
        .unwrap_or(AssetCriticality::Unknown)
}

fn default_latency_for(service_name: &str) -> f64 {
    let lowered = service_name.to_ascii_lowercase();
    if lowered.contains("gateway") {
        GATEWAY_AVG_LATENCY_MS
    } else if lowered.contains("db") || lowered.contains("database") {
        DATABASE_AVG_LATENCY_MS
    } else {
        DEFAULT_AVG_LATENCY_MS
    }
}

fn derive_latency_threshold(executor: &ToolExecutor<'_>, service_name: &str) -> f64 {
    let default_latency = default_latency_for(service_name);
    let mut params = BTreeMap::new();
    params.insert("service_name".to_string(), Value::from(service_name));
    let current_latency = executor
        .run_query(TOOL_CURRENT_METRICS, &params)
        .ok()
        .and_then(|result| {
            let index = result.columns.iter().position(|c| c == "avg_latency_ms")?;
            result.values.first()?.get(index)?.as_f64()
        });

    match current_latency {
        Some(current) if current > default_latency => {
            (current * DERIVED_LATENCY_FRACTION).clamp(MIN_DERIVED_LATENCY_MS, MAX_DERIVED_LATENCY_MS)
        }
        _ => default_latency,
    }
}

fn derive_success_criteria(actions: &[PlanAction], executor: &ToolExecutor<'_>) -> Vec<SuccessCriterion> {
    let mut services: Vec<&str> = actions.iter().map(|action| action.target_asset.as_str()).collect();
    services.sort_unstable();
    services.dedup();

    services
        .into_iter()
        .flat_map(|service_name| {
            let latency_threshold = derive_latency_threshold(executor, service_name);
            [
                SuccessCriterion {
                    metric: "error_rate".to_string(),
                    operator: ComparisonOperator::Lte,
                    threshold: 1.0,
                    service_name: service_name.to_string(),
                },
                SuccessCriterion {
                    metric: "avg_latency".to_string(),
                    operator: ComparisonOperator::Lte,
                    threshold: latency_threshold,
                    service_name: service_name.to_string(),
                },
                SuccessCriterion {
                    metric: "throughput".to_string(),
                    operator: ComparisonOperator::Gte,
                    threshold: 80.0,
                    service_name: service_name.to_string(),
                },
            ]
        })
        .collect()
}

impl AgentHandler for CommanderHandler {
    fn task(&self) -> Task {
        Task::PlanRemediation
    }

    fn invoke(&self, request: Value) -> Result<Value, AgentError> {
        let request: PlanRemediationRequest = serde_json::from_value(request)
            .map_err(|err| AgentError::Rejected(format!("malformed plan_remediation request: {err}")))?;

        let plan = self.build_plan(&request);
        let response = PlanResponse { plan };
        serde_json::to_value(response).map_err(|err| AgentError::Rejected(format!("failed to serialize plan response: {err}")))
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
    use vigil_broker::tools::QueryToolDefinition;
    use vigil_broker::tools::ToolParam;
    use vigil_core::identifiers::IncidentId;
    use vigil_core::identifiers::InvestigationId;
    use vigil_core::identifiers::RunbookId;
    use vigil_core::model::investigation::InvestigationReport;
    use vigil_core::model::investigation::RecommendedNext;
    use vigil_core::model::RollbackStep;
    use vigil_core::model::RunbookStep;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::FixedClock;

    use super::*;

    fn catalog() -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_RUNBOOK_MATCH.to_string(),
                index: RUNBOOKS_INDEX.to_string(),
                params: vec![ToolParam::required("incident_id")],
                filter_template: json!({ "incident_id": "?incident_id" }),
                columns: vec!["runbook_id".to_string()],
                size: 5,
            })
            .expect("valid definition");
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_ASSET_CRITICALITY.to_string(),
                index: "vigil-assets".to_string(),
                params: vec![ToolParam::required("asset_id")],
                filter_template: json!({ "asset_id": "?asset_id" }),
                columns: vec!["criticality".to_string()],
                size: 1,
            })
            .expect("valid definition");
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_CURRENT_METRICS.to_string(),
                index: "vigil-metrics-services".to_string(),
                params: vec![ToolParam::required("service_name")],
                filter_template: json!({ "service_name": "?service_name" }),
                columns: vec!["avg_latency_ms".to_string()],
                size: 1,
            })
            .expect("valid definition");
        catalog
    }

    fn request(incident_id: IncidentId) -> PlanRemediationRequest {
        PlanRemediationRequest {
            incident_id: incident_id.clone(),
            investigation_report: InvestigationReport {
                investigation_id: InvestigationId::new("INV-1"),
                incident_id,
                iteration: 1,
                root_cause: "brute force login".to_string(),
                attack_chain: Vec::new(),
                blast_radius: Vec::new(),
                threat_intel: None,
                change_correlation: None,
                recommended_next: RecommendedNext::PlanRemediation,
            },
            threat_scope: None,
        }
    }

    #[test]
    fn builds_an_ordered_deduplicated_plan_from_the_top_matched_runbook() {
        let store = InMemoryDocumentStore::new();
        let incident = Incident::new_detected(
            IncidentId::new("INC-2026-00010"),
            vigil_core::model::IncidentType::Security,
            Severity::Critical,
            0.95,
            vigil_core::identifiers::AlertId::new("alert-1"),
            chrono::Utc::now(),
        );
        store.index(INCIDENTS_INDEX, Some(incident.incident_id.as_str()), serde_json::to_value(&incident).unwrap()).unwrap();

        let runbook = Runbook {
            runbook_id: RunbookId::new("RB-brute-force"),
            steps: vec![
                RunbookStep {
                    description: "Block the offending source IP".to_string(),
                    target_system: "firewall".to_string(),
                    target_asset: AssetId::new("srv-payment-01"),
                    approval_required: false,
                    rollback: vec![RollbackStep { description: "unblock".to_string(), target_system: "firewall".to_string() }],
                },
                RunbookStep {
                    description: "Notify the on-call security channel".to_string(),
                    target_system: "chat".to_string(),
                    target_asset: AssetId::new("srv-payment-01"),
                    approval_required: false,
                    rollback: Vec::new(),
                },
            ],
        };
        store.index(RUNBOOKS_INDEX, Some(runbook.runbook_id.as_str()), serde_json::to_value(&runbook).unwrap()).unwrap();
        store
            .index(RUNBOOKS_INDEX, None, json!({"incident_id": "INC-2026-00010", "runbook_id": "RB-brute-force"}))
            .unwrap();
        store.index("vigil-assets", None, json!({"asset_id": "srv-payment-01", "criticality": "tier-1"})).unwrap();

        let handler = CommanderHandler::new(catalog(), Arc::new(store), Arc::new(FixedClock::new(chrono::Utc::now())));
        let response = handler
            .invoke(serde_json::to_value(request(incident.incident_id)).unwrap())
            .expect("plan must succeed");
        let response: PlanResponse = serde_json::from_value(response).unwrap();

        assert_eq!(response.plan.actions.len(), 2);
        assert_eq!(response.plan.actions[0].action_type, ActionType::Containment);
        assert_eq!(response.plan.actions[0].order, 1);
        assert_eq!(response.plan.actions[1].action_type, ActionType::Communication);
        assert!(response.plan.actions[0].approval_required, "firewall block on a tier-1 asset requires approval");
        assert!(response.plan.requires_approval);
        assert_eq!(response.plan.runbook_used, Some(RunbookId::new("RB-brute-force")));
        assert_eq!(response.plan.success_criteria.len(), 3);
    }

    #[test]
    fn falls_back_to_a_single_escalation_action_when_no_runbook_matches() {
        let store = InMemoryDocumentStore::new();
        let incident = Incident::new_detected(
            IncidentId::new("INC-2026-00011"),
            vigil_core::model::IncidentType::Security,
            Severity::Medium,
            0.5,
            vigil_core::identifiers::AlertId::new("alert-2"),
            chrono::Utc::now(),
        );
        store.index(INCIDENTS_INDEX, Some(incident.incident_id.as_str()), serde_json::to_value(&incident).unwrap()).unwrap();

        let handler = CommanderHandler::new(catalog(), Arc::new(store), Arc::new(FixedClock::new(chrono::Utc::now())));
        let response = handler
            .invoke(serde_json::to_value(request(incident.incident_id)).unwrap())
            .expect("plan must never throw to the orchestrator");
        let response: PlanResponse = serde_json::from_value(response).unwrap();

        assert_eq!(response.plan.actions.len(), 1);
        assert_eq!(response.plan.actions[0].description, "describe_escalation");
        assert!(!response.plan.requires_approval);
    }
}
