// vigil-agents/src/investigator.rs
// ============================================================================
// Module: Investigator Handler
// Description: Deterministic `investigate` agent handler (§4.6 Investigator).
// Purpose: Reconstruct what happened for a security incident, or correlate
//          an operational anomaly with a recent deployment, and recommend
//          what the coordinator should do next.
// ============================================================================

//! ## Overview
//! The investigator reads the incident document for its type, severity, and
//! implicated assets, then runs a fixed sequence of read-only tool queries
//! appropriate to that type. For a security incident the attack-chain tracer
//! is tried against three widening tool definitions (1h/6h/24h) since the
//! document store's equality-only filter has no native time-range query;
//! each widening step is a distinct registered tool rather than a parameter,
//! so the catalog's validation still applies to every step.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use vigil_broker::tools::ToolCatalog;
use vigil_broker::tools::ToolExecutor;
use vigil_broker::AgentError;
use vigil_broker::AgentHandler;
use vigil_contract::payloads::InvestigateRequest;
use vigil_contract::task::Task;
use vigil_core::identifiers::InvestigationId;
use vigil_core::model::incident::Incident;
use vigil_core::model::investigation::AttackStep;
use vigil_core::model::investigation::BlastRadiusEntry;
use vigil_core::model::investigation::ChangeCorrelation;
use vigil_core::model::investigation::ChangeCorrelationConfidence;
use vigil_core::model::investigation::InvestigationReport;
use vigil_core::model::investigation::RecommendedNext;
use vigil_core::model::investigation::ThreatIntelMatch;
use vigil_core::model::IncidentType;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;

const INCIDENTS_INDEX: &str = "vigil-incidents";

/// Widening attack-chain tracer tools, tried in order until one returns at
/// least two hits (§4.6: "progressively widens time window 1h→6h→24h if
/// sparse").
pub const TOOL_ATTACK_CHAIN_TRACER_1H: &str = "attack_chain_tracer_1h";
/// Six-hour widening of the attack-chain tracer.
pub const TOOL_ATTACK_CHAIN_TRACER_6H: &str = "attack_chain_tracer_6h";
/// Twenty-four-hour widening of the attack-chain tracer.
pub const TOOL_ATTACK_CHAIN_TRACER_24H: &str = "attack_chain_tracer_24h";
/// Query tool sweeping implicated assets for blast-radius candidates.
pub const TOOL_BLAST_RADIUS_SWEEP: &str = "blast_radius_sweep";
/// Query tool mapping a rule id to a MITRE ATT&CK technique id.
pub const TOOL_MITRE_LOOKUP: &str = "mitre_lookup";
/// Search tool matching alert indicators against threat-intel feeds.
pub const TOOL_THREAT_INTEL_MATCH: &str = "threat_intel_match";
/// Query tool counting similar prior incidents for the same asset.
pub const TOOL_INCIDENT_SIMILARITY: &str = "incident_similarity_search";
/// Query tool correlating an operational anomaly with a recent deployment.
pub const TOOL_CHANGE_CORRELATION: &str = "change_correlation";

const SPARSE_THRESHOLD: usize = 2;

/// The `investigate` agent handler (§4.6 Investigator).
pub struct InvestigatorHandler {
    catalog: ToolCatalog,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl InvestigatorHandler {
    /// Builds an investigator handler over `catalog`'s investigation tools.
    #[must_use]
    pub fn new(catalog: ToolCatalog, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, store, clock }
    }

    fn load_incident(&self, incident_id: &str) -> Result<Incident, AgentError> {
        let document = self
            .store
            .get(INCIDENTS_INDEX, incident_id)
            .map_err(|err| AgentError::Failed { message: format!("incident {incident_id} not found: {err}"), retryable: false })?;
        serde_json::from_value(document.source)
            .map_err(|err| AgentError::Rejected(format!("malformed incident document: {err}")))
    }

    fn investigate_security(&self, incident: &Incident) -> (String, Vec<AttackStep>, Vec<BlastRadiusEntry>, Option<Vec<ThreatIntelMatch>>, RecommendedNext) {
        let executor = ToolExecutor::new(&self.catalog, self.store.as_ref(), self.clock.as_ref());
        let asset_id = incident.alert_ids.first().map_or("unknown-asset", vigil_core::identifiers::AlertId::as_str);

        let mut attack_chain = Vec::new();
        for tool in [TOOL_ATTACK_CHAIN_TRACER_1H, TOOL_ATTACK_CHAIN_TRACER_6H, TOOL_ATTACK_CHAIN_TRACER_24H] {
            attack_chain = attack_chain_rows(&executor, tool, asset_id);
            if attack_chain.len() >= SPARSE_THRESHOLD {
                break;
            }
        }

        if let (Some(last), Some(technique_id)) = (attack_chain.last().cloned(), mitre_technique(&executor, asset_id)) {
            let mut step = last;
            step.technique_id = Some(technique_id);
            let last_index = attack_chain.len() - 1;
            attack_chain[last_index] = step;
        }

        let blast_radius = blast_radius_rows(&executor, asset_id);
        let threat_intel = threat_intel_rows(&executor, asset_id);
        let similar_incident_count = similarity_count(&executor, asset_id);

        let external_attacker_evidence = threat_intel.as_ref().is_some_and(|hits| !hits.is_empty()) || similar_incident_count > 0;
        let recommended_next = if attack_chain.is_empty() && blast_radius.is_empty() {
            RecommendedNext::Escalate
        } else if external_attacker_evidence {
            RecommendedNext::ThreatHunt
        } else {
            RecommendedNext::PlanRemediation
        };

        let root_cause = if attack_chain.is_empty() {
            "No attack-chain evidence found within the 24h widened window.".to_string()
        } else {
            format!("Reconstructed a {}-step attack chain against {asset_id}.", attack_chain.len())
        };

        (root_cause, attack_chain, blast_radius, threat_intel, recommended_next)
    }

    fn investigate_operational(&self, incident: &Incident) -> (String, ChangeCorrelation, RecommendedNext) {
        let executor = ToolExecutor::new(&self.catalog, self.store.as_ref(), self.clock.as_ref());
        let asset_id = incident.alert_ids.first().map_or("unknown-asset", vigil_core::identifiers::AlertId::as_str);

        let mut params = BTreeMap::new();
        params.insert("asset_id".to_string(), Value::from(asset_id));
        let deployment = executor.run_query(TOOL_CHANGE_CORRELATION, &params).ok();

        let correlation = deployment.as_ref().and_then(|result| {
            let commit = column_str(result, "commit")?;
            let author = column_str(result, "author")?;
            let time_gap_seconds = column_f64(result, "time_gap_seconds")?;
            Some(ChangeCorrelation {
                matched: true,
                confidence: Some(ChangeCorrelationConfidence::from_time_gap_seconds(time_gap_seconds)),
                commit: Some(commit),
                author: Some(author),
                time_gap_seconds: Some(time_gap_seconds),
            })
        });

        let correlation = correlation.unwrap_or(ChangeCorrelation { matched: false, confidence: None, commit: None, author: None, time_gap_seconds: None });

        let recommended_next = if correlation.matched { RecommendedNext::PlanRemediation } else { RecommendedNext::Escalate };
        let root_cause = if correlation.matched {
            format!(
                "Correlated with deployment {} by {}, {:.0}s before the anomaly.",
                correlation.commit.as_deref().unwrap_or("unknown"),
                correlation.author.as_deref().unwrap_or("unknown"),
                correlation.time_gap_seconds.unwrap_or(0.0)
            )
        } else {
            "No correlating deployment event found.".to_string()
        };

        (root_cause, correlation, recommended_next)
    }
}

fn attack_chain_rows(executor: &ToolExecutor<'_>, tool: &str, asset_id: &str) -> Vec<AttackStep> {
    let mut params = BTreeMap::new();
    params.insert("asset_id".to_string(), Value::from(asset_id));
    executor
        .run_query(tool, &params)
        .map(|result| {
            result
                .values
                .iter()
                .enumerate()
                .map(|(index, row)| AttackStep {
                    order: u32::try_from(index + 1).unwrap_or(u32::MAX),
                    technique_id: column_index_str(&result.columns, row, "technique_id"),
                    description: column_index_str(&result.columns, row, "description").unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn blast_radius_rows(executor: &ToolExecutor<'_>, asset_id: &str) -> Vec<BlastRadiusEntry> {
    let mut params = BTreeMap::new();
    params.insert("asset_id".to_string(), Value::from(asset_id));
    executor
        .run_query(TOOL_BLAST_RADIUS_SWEEP, &params)
        .map(|result| {
            result
                .values
                .iter()
                .filter_map(|row| {
                    let asset = column_index_str(&result.columns, row, "asset")?;
                    let confidence = column_index_f64(&result.columns, row, "confidence")?;
                    Some(BlastRadiusEntry { asset: vigil_core::identifiers::AssetId::new(asset), confidence })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn mitre_technique(executor: &ToolExecutor<'_>, asset_id: &str) -> Option<String> {
    let mut params = BTreeMap::new();
    params.insert("asset_id".to_string(), Value::from(asset_id));
    executor.run_query(TOOL_MITRE_LOOKUP, &params).ok().and_then(|result| column_str(&result, "technique_id"))
}

fn threat_intel_rows(executor: &ToolExecutor<'_>, asset_id: &str) -> Option<Vec<ThreatIntelMatch>> {
    executor
        .run_search(TOOL_THREAT_INTEL_MATCH, Some(asset_id), None, None)
        .ok()
        .map(|result| {
            result
                .results
                .iter()
                .filter_map(|hit| {
                    Some(ThreatIntelMatch {
                        indicator: hit.get("indicator")?.as_str()?.to_string(),
                        indicator_type: hit.get("indicator_type")?.as_str()?.to_string(),
                        source: hit.get("source")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
}

fn similarity_count(executor: &ToolExecutor<'_>, asset_id: &str) -> usize {
    let mut params = BTreeMap::new();
    params.insert("asset_id".to_string(), Value::from(asset_id));
    executor.run_query(TOOL_INCIDENT_SIMILARITY, &params).map(|result| result.values.len()).unwrap_or(0)
}

fn column_index_str(columns: &[String], row: &[Value], column: &str) -> Option<String> {
    let index = columns.iter().position(|c| c == column)?;
    row.get(index)?.as_str().map(str::to_string)
}

fn column_index_f64(columns: &[String], row: &[Value], column: &str) -> Option<f64> {
    let index = columns.iter().position(|c| c == column)?;
    row.get(index)?.as_f64()
}

fn column_str(result: &vigil_broker::tools::QueryResult, column: &str) -> Option<String> {
    column_index_str(&result.columns, result.values.first()?, column)
}

fn column_f64(result: &vigil_broker::tools::QueryResult, column: &str) -> Option<f64> {
    column_index_f64(&result.columns, result.values.first()?, column)
}

impl AgentHandler for InvestigatorHandler {
    fn task(&self) -> Task {
        Task::Investigate
    }

    fn invoke(&self, request: Value) -> Result<Value, AgentError> {
        let request: InvestigateRequest = serde_json::from_value(request)
            .map_err(|err| AgentError::Rejected(format!("malformed investigate request: {err}")))?;

        let incident = self.load_incident(request.incident_id.as_str())?;

        let (mut root_cause, attack_chain, blast_radius, threat_intel, change_correlation, recommended_next) = match incident.incident_type {
            IncidentType::Security => {
                let (root_cause, attack_chain, blast_radius, threat_intel, recommended_next) = self.investigate_security(&incident);
                (root_cause, attack_chain, blast_radius, threat_intel, None, recommended_next)
            }
            IncidentType::Operational => {
                let (root_cause, correlation, recommended_next) = self.investigate_operational(&incident);
                (root_cause, Vec::new(), Vec::new(), None, Some(correlation), recommended_next)
            }
        };

        if let Some(analysis) = &request.previous_failure_analysis {
            root_cause = format!("{root_cause} Reflecting on prior failure: {analysis}");
        }

        let report = InvestigationReport {
            investigation_id: InvestigationId::new(format!("INV-{}-{}", request.incident_id.as_str(), request.iteration)),
            incident_id: request.incident_id,
            iteration: request.iteration,
            root_cause,
            attack_chain,
            blast_radius,
            threat_intel,
            change_correlation,
            recommended_next,
        };

        serde_json::to_value(report).map_err(|err| AgentError::Rejected(format!("failed to serialize investigation report: {err}")))
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
    use vigil_broker::tools::SearchKind;
    use vigil_broker::tools::SearchToolDefinition;
    use vigil_broker::tools::ToolParam;
    use vigil_core::identifiers::AlertId;
    use vigil_core::identifiers::IncidentId;
    use vigil_core::scoring::Severity;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::FixedClock;

    use super::*;

    fn catalog() -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        for (tool, size) in [
            (TOOL_ATTACK_CHAIN_TRACER_1H, 3),
            (TOOL_ATTACK_CHAIN_TRACER_6H, 10),
            (TOOL_ATTACK_CHAIN_TRACER_24H, 25),
        ] {
            catalog
                .register_query(QueryToolDefinition {
                    name: tool.to_string(),
                    index: "vigil-security-events".to_string(),
                    params: vec![ToolParam::required("asset_id")],
                    filter_template: json!({ "asset_id": "?asset_id" }),
                    columns: vec!["technique_id".to_string(), "description".to_string()],
                    size,
                })
                .expect("valid definition");
        }
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_BLAST_RADIUS_SWEEP.to_string(),
                index: "vigil-assets".to_string(),
                params: vec![ToolParam::required("asset_id")],
                filter_template: json!({ "seed_asset": "?asset_id" }),
                columns: vec!["asset".to_string(), "confidence".to_string()],
                size: 10,
            })
            .expect("valid definition");
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_MITRE_LOOKUP.to_string(),
                index: "vigil-mitre-techniques".to_string(),
                params: vec![ToolParam::required("asset_id")],
                filter_template: json!({ "asset_id": "?asset_id" }),
                columns: vec!["technique_id".to_string()],
                size: 1,
            })
            .expect("valid definition");
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_INCIDENT_SIMILARITY.to_string(),
                index: "vigil-incidents".to_string(),
                params: vec![ToolParam::required("asset_id")],
                filter_template: json!({ "asset_id": "?asset_id" }),
                columns: vec!["incident_id".to_string()],
                size: 10,
            })
            .expect("valid definition");
        catalog
            .register_search(SearchToolDefinition {
                name: TOOL_THREAT_INTEL_MATCH.to_string(),
                index: "vigil-threat-intel".to_string(),
                kind: SearchKind::Keyword,
                text_field: Some("indicator".to_string()),
                vector_field: None,
                result_fields: vec!["indicator".to_string(), "indicator_type".to_string(), "source".to_string()],
                min_score: None,
            })
            .expect("valid definition");
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_CHANGE_CORRELATION.to_string(),
                index: "vigil-deployments".to_string(),
                params: vec![ToolParam::required("asset_id")],
                filter_template: json!({ "asset_id": "?asset_id" }),
                columns: vec!["commit".to_string(), "author".to_string(), "time_gap_seconds".to_string()],
                size: 1,
            })
            .expect("valid definition");
        catalog
    }

    fn seeded_security_incident(store: &InMemoryDocumentStore) -> IncidentId {
        let incident = Incident::new_detected(
            IncidentId::new("INC-2026-00001"),
            IncidentType::Security,
            Severity::High,
            0.9,
            AlertId::new("srv-payment-01"),
            chrono::Utc::now(),
        );
        store.index(INCIDENTS_INDEX, Some(incident.incident_id.as_str()), serde_json::to_value(&incident).unwrap()).unwrap();
        incident.incident_id
    }

    #[test]
    fn security_incident_with_threat_intel_recommends_threat_hunt() {
        let store = InMemoryDocumentStore::new();
        let incident_id = seeded_security_incident(&store);
        store
            .index("vigil-security-events", None, json!({"asset_id": "srv-payment-01", "technique_id": "T1110", "description": "brute force login"}))
            .unwrap();
        store
            .index("vigil-security-events", None, json!({"asset_id": "srv-payment-01", "technique_id": "T1078", "description": "valid account use"}))
            .unwrap();
        store.index("vigil-threat-intel", None, json!({"indicator": "srv-payment-01", "indicator_type": "asset", "source": "feed-x"})).unwrap();

        let handler = InvestigatorHandler::new(catalog(), Arc::new(store), Arc::new(FixedClock::new(chrono::Utc::now())));
        let request = InvestigateRequest { incident_id, iteration: 1, previous_failure_analysis: None };
        let response = handler.invoke(serde_json::to_value(request).unwrap()).expect("investigation must succeed");
        let report: InvestigationReport = serde_json::from_value(response).unwrap();
        assert_eq!(report.recommended_next, RecommendedNext::ThreatHunt);
        assert_eq!(report.attack_chain.len(), 2);
    }

    #[test]
    fn security_incident_with_no_evidence_escalates() {
        let store = InMemoryDocumentStore::new();
        let incident_id = seeded_security_incident(&store);
        let handler = InvestigatorHandler::new(catalog(), Arc::new(store), Arc::new(FixedClock::new(chrono::Utc::now())));
        let request = InvestigateRequest { incident_id, iteration: 1, previous_failure_analysis: None };
        let response = handler.invoke(serde_json::to_value(request).unwrap()).expect("investigation must succeed");
        let report: InvestigationReport = serde_json::from_value(response).unwrap();
        assert_eq!(report.recommended_next, RecommendedNext::Escalate);
    }

    #[test]
    fn operational_incident_correlates_with_a_recent_deployment() {
        let store = InMemoryDocumentStore::new();
        let incident = Incident::new_detected(
            IncidentId::new("INC-2026-00002"),
            IncidentType::Operational,
            Severity::Medium,
            0.5,
            AlertId::new("svc-checkout"),
            chrono::Utc::now(),
        );
        store.index(INCIDENTS_INDEX, Some(incident.incident_id.as_str()), serde_json::to_value(&incident).unwrap()).unwrap();
        store
            .index("vigil-deployments", None, json!({"asset_id": "svc-checkout", "commit": "abc123", "author": "alice", "time_gap_seconds": 120.0}))
            .unwrap();

        let handler = InvestigatorHandler::new(catalog(), Arc::new(store), Arc::new(FixedClock::new(chrono::Utc::now())));
        let request = InvestigateRequest { incident_id: incident.incident_id, iteration: 1, previous_failure_analysis: None };
        let response = handler.invoke(serde_json::to_value(request).unwrap()).expect("investigation must succeed");
        let report: InvestigationReport = serde_json::from_value(response).unwrap();
        let correlation = report.change_correlation.expect("operational reports carry change_correlation");
        assert_eq!(correlation.confidence, Some(ChangeCorrelationConfidence::High));
        assert_eq!(report.recommended_next, RecommendedNext::PlanRemediation);
    }
}
