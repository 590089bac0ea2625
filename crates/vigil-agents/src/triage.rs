// vigil-agents/src/triage.rs
// ============================================================================
// Module: Triage Handler
// Description: Deterministic `enrich_and_score` agent handler (§4.6 Triage).
// Purpose: Score an alert from its enrichment signals and write the verdict
//          back onto the alert document.
// ============================================================================

//! ## Overview
//! Triage fans three read-only queries out across the store (alert
//! enrichment, historical false-positive rate, asset criticality), folds
//! whichever of them succeeded into the §4.2 scoring formula — substituting
//! the documented neutral default for any that failed — and writes the
//! verdict back onto the alert before returning a contract response. A tool
//! failure here is never fatal: the handler always emits a valid response.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use serde_json::Value;
use vigil_broker::registry::AgentHandler;
use vigil_broker::tools::ToolCatalog;
use vigil_broker::tools::ToolExecutor;
use vigil_broker::AgentError;
use vigil_contract::payloads::EnrichAndScoreRequest;
use vigil_contract::payloads::TriageResponse;
use vigil_contract::task::Task;
use vigil_core::scoring::AssetCriticality;
use vigil_core::scoring::ScoringInputs;
use vigil_core::scoring::ScoringThresholds;
use vigil_core::scoring::Severity;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;

const ALERTS_INDEX: &str = "vigil-alerts-security";

/// Query tool names triage expects in its [`ToolCatalog`] (§4.6 Triage).
pub const TOOL_ALERT_ENRICHMENT: &str = "alert_enrichment";
/// Query tool returning the triggering rule's historical false-positive rate.
pub const TOOL_HISTORICAL_FP_RATE: &str = "historical_fp_rate";
/// Query tool returning the affected asset's criticality tier.
pub const TOOL_ASSET_CRITICALITY: &str = "asset_criticality";

/// The `enrich_and_score` / triage agent handler (§4.6 Triage).
pub struct TriageHandler {
    catalog: ToolCatalog,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    thresholds: ScoringThresholds,
}

impl TriageHandler {
    /// Builds a triage handler over `catalog`'s three enrichment tools.
    #[must_use]
    pub fn new(catalog: ToolCatalog, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, thresholds: ScoringThresholds) -> Self {
        Self { catalog, store, clock, thresholds }
    }

    fn score(&self, alert: &vigil_core::model::Alert) -> (f64, BTreeMap<String, Value>) {
        let executor = ToolExecutor::new(&self.catalog, self.store.as_ref(), self.clock.as_ref());

        let (risk_signal, fp_rate, criticality) = thread::scope(|scope| {
            let alert_id = alert.alert_id.as_str();
            let rule_id = alert.rule_id.as_str();
            let asset_id = alert.asset.as_str();

            let risk = scope.spawn(|| run_numeric_query(&executor, TOOL_ALERT_ENRICHMENT, "alert_id", alert_id, "risk_signal", 0.0));
            let fp = scope.spawn(|| run_numeric_query(&executor, TOOL_HISTORICAL_FP_RATE, "rule_id", rule_id, "fp_rate", 0.0));
            let tier = scope.spawn(|| run_criticality_query(&executor, asset_id));

            (
                risk.join().unwrap_or(0.0),
                fp.join().unwrap_or(0.0),
                tier.join().unwrap_or(AssetCriticality::Tier3),
            )
        });

        let severity = Severity::parse(&alert.severity_label);
        let inputs = ScoringInputs { severity, asset_criticality: criticality, risk_signal, historical_fp_rate: fp_rate };
        let score = vigil_core::scoring::priority_score(&inputs);

        let mut enrichment = alert.enrichment.clone();
        enrichment.insert("risk_signal".to_string(), Value::from(risk_signal));
        enrichment.insert("historical_fp_rate".to_string(), Value::from(fp_rate));
        enrichment.insert("asset_criticality".to_string(), Value::from(criticality_label(criticality)));
        enrichment.insert("priority_score".to_string(), Value::from(score));

        (score, enrichment)
    }
}

fn run_numeric_query(executor: &ToolExecutor<'_>, tool: &str, param: &str, value: &str, column: &str, default: f64) -> f64 {
    let mut params = BTreeMap::new();
    params.insert(param.to_string(), Value::from(value));
    executor
        .run_query(tool, &params)
        .ok()
        .and_then(|result| first_numeric_column(&result, column))
        .unwrap_or(default)
}

fn run_criticality_query(executor: &ToolExecutor<'_>, asset_id: &str) -> AssetCriticality {
    let mut params = BTreeMap::new();
    params.insert("asset_id".to_string(), Value::from(asset_id));
    executor
        .run_query(TOOL_ASSET_CRITICALITY, &params)
        .ok()
        .and_then(|result| first_string_column(&result, "criticality"))
        .map(|label| AssetCriticality::parse(&label))
        .unwrap_or(AssetCriticality::Tier3)
}

fn first_numeric_column(result: &vigil_broker::tools::QueryResult, column: &str) -> Option<f64> {
    let index = result.columns.iter().position(|c| c == column)?;
    result.values.first()?.get(index)?.as_f64()
}

fn first_string_column(result: &vigil_broker::tools::QueryResult, column: &str) -> Option<String> {
    let index = result.columns.iter().position(|c| c == column)?;
    result.values.first()?.get(index)?.as_str().map(str::to_string)
}

fn criticality_label(tier: AssetCriticality) -> &'static str {
    match tier {
        AssetCriticality::Tier1 => "tier-1",
        AssetCriticality::Tier2 => "tier-2",
        AssetCriticality::Tier3 => "tier-3",
        AssetCriticality::Unknown => "unknown",
    }
}

impl AgentHandler for TriageHandler {
    fn task(&self) -> Task {
        Task::EnrichAndScore
    }

    fn invoke(&self, request: Value) -> Result<Value, AgentError> {
        let request: EnrichAndScoreRequest = serde_json::from_value(request)
            .map_err(|err| AgentError::Rejected(format!("malformed enrich_and_score request: {err}")))?;

        let (score, enrichment) = self.score(&request.alert);
        let disposition = vigil_core::scoring::disposition(score, &self.thresholds);

        let mut alert = request.alert;
        alert.enrichment = enrichment;
        alert.processed = true;
        if let Err(err) = self.store.index(ALERTS_INDEX, Some(alert.alert_id.as_str()), serde_json::to_value(&alert).unwrap_or(Value::Null)) {
            return Err(AgentError::Failed { message: format!("failed to write back alert: {err}"), retryable: true });
        }

        let response = TriageResponse { priority_score: score, disposition };
        serde_json::to_value(response).map_err(|err| AgentError::Rejected(format!("failed to serialize triage response: {err}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use std::collections::BTreeMap as Map;

    use serde_json::json;
    use vigil_broker::tools::QueryToolDefinition;
    use vigil_broker::tools::ToolParam;
    use vigil_core::identifiers::AlertId;
    use vigil_core::identifiers::AssetId;
    use vigil_core::identifiers::RuleId;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::FixedClock;

    use super::*;

    fn catalog() -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_ALERT_ENRICHMENT.to_string(),
                index: "vigil-alert-signals".to_string(),
                params: vec![ToolParam::required("alert_id")],
                filter_template: json!({ "alert_id": "?alert_id" }),
                columns: vec!["risk_signal".to_string()],
                size: 1,
            })
            .expect("valid definition");
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_HISTORICAL_FP_RATE.to_string(),
                index: "vigil-rule-stats".to_string(),
                params: vec![ToolParam::required("rule_id")],
                filter_template: json!({ "rule_id": "?rule_id" }),
                columns: vec!["fp_rate".to_string()],
                size: 1,
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
    }

    fn alert() -> vigil_core::model::Alert {
        vigil_core::model::Alert {
            alert_id: AlertId::new("alert-1"),
            rule_id: RuleId::new("geo-anomaly-login"),
            severity_label: "high".to_string(),
            source: "203.0.113.42".to_string(),
            destination: None,
            asset: AssetId::new("srv-payment-01"),
            enrichment: Map::new(),
            created_at: chrono::Utc::now(),
            processed: false,
        }
    }

    #[test]
    fn scores_using_seeded_enrichment_and_writes_back_the_alert() {
        let store = InMemoryDocumentStore::new();
        store.index("vigil-alert-signals", None, json!({"alert_id": "alert-1", "risk_signal": 72.5})).unwrap();
        store.index("vigil-rule-stats", None, json!({"rule_id": "geo-anomaly-login", "fp_rate": 0.02})).unwrap();
        store.index("vigil-assets", None, json!({"asset_id": "srv-payment-01", "criticality": "tier-1"})).unwrap();

        let handler = TriageHandler::new(
            catalog(),
            Arc::new(store),
            Arc::new(FixedClock::new(chrono::Utc::now())),
            ScoringThresholds::default(),
        );

        let request = EnrichAndScoreRequest { alert: alert() };
        let response = handler.invoke(serde_json::to_value(request).unwrap()).expect("triage must succeed");
        let response: TriageResponse = serde_json::from_value(response).unwrap();
        assert!((response.priority_score - 0.9137).abs() < 0.01);
        assert_eq!(response.disposition, vigil_core::scoring::Disposition::Investigate);
    }

    #[test]
    fn missing_enrichment_data_falls_back_to_neutral_defaults_and_still_responds() {
        let store = InMemoryDocumentStore::new();
        let handler = TriageHandler::new(
            catalog(),
            Arc::new(store),
            Arc::new(FixedClock::new(chrono::Utc::now())),
            ScoringThresholds::default(),
        );

        let request = EnrichAndScoreRequest { alert: alert() };
        let response = handler.invoke(serde_json::to_value(request).unwrap()).expect("triage must never block the pipeline");
        let response: TriageResponse = serde_json::from_value(response).unwrap();
        assert!(response.priority_score > 0.0);
    }
}
