// vigil-coordinator/src/wiring.rs
// ============================================================================
// Module: Registry Wiring
// Description: Builds the tool catalogs each agent handler needs and
//              assembles all six handlers into one `HandlerRegistry` (§4.3,
//              §4.6, §4.7).
// Purpose: One construction point for the A2A handler side, mirroring
//          `vigil_providers::suite::IntegrationSuite::from_config` on the
//          integration side.
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use vigil_agents::CommanderHandler;
use vigil_agents::ExecutorHandler;
use vigil_agents::InvestigatorHandler;
use vigil_agents::ThreatHunterHandler;
use vigil_agents::TriageHandler;
use vigil_agents::VerifierHandler;
use vigil_broker::HandlerRegistry;
use vigil_broker::error::ToolError;
use vigil_broker::tools::QueryToolDefinition;
use vigil_broker::tools::SearchKind;
use vigil_broker::tools::SearchToolDefinition;
use vigil_broker::tools::ToolCatalog;
use vigil_broker::tools::ToolParam;
use vigil_config::VigilConfigFile;
use vigil_core::scoring::ScoringThresholds;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;
use vigil_providers::IntegrationSuite;
use vigil_providers::RetryConfig;

/// Agent ids as they appear on the wire and in the handler registry (§4.6).
pub mod agent_id {
    /// The triage handler.
    pub const TRIAGE: &str = "triage";
    /// The investigator handler.
    pub const INVESTIGATOR: &str = "investigator";
    /// The threat-hunter handler.
    pub const THREAT_HUNTER: &str = "threat-hunter";
    /// The commander (remediation planning) handler.
    pub const COMMANDER: &str = "commander";
    /// The executor handler.
    pub const EXECUTOR: &str = "executor";
    /// The verifier handler.
    pub const VERIFIER: &str = "verifier";
    /// The coordinator itself, used as `from_agent` on outbound envelopes.
    pub const COORDINATOR: &str = "coordinator";
}

/// Per-agent A2A call timeouts (§4.7).
pub mod timeout_ms {
    /// Triage: fast, single-alert scoring.
    pub const TRIAGE: u64 = 10_000;
    /// Investigator: multi-tool root-cause analysis.
    pub const INVESTIGATOR: u64 = 60_000;
    /// Threat hunter: environment-wide sweep.
    pub const THREAT_HUNTER: u64 = 90_000;
    /// Commander: remediation planning.
    pub const COMMANDER: u64 = 45_000;
    /// Executor: runs the plan's actions against live integrations.
    pub const EXECUTOR: u64 = 300_000;
    /// Verifier: waits out a stabilization window before checking criteria.
    pub const VERIFIER: u64 = 120_000;
}

fn triage_catalog() -> Result<ToolCatalog, ToolError> {
    let mut catalog = ToolCatalog::new();
    catalog.register_query(QueryToolDefinition {
        name: "alert_enrichment".to_string(),
        index: "vigil-alert-signals".to_string(),
        params: vec![ToolParam::required("alert_id")],
        filter_template: json!({ "alert_id": "?alert_id" }),
        columns: vec!["risk_signal".to_string()],
        size: 1,
    })?;
    catalog.register_query(QueryToolDefinition {
        name: "historical_fp_rate".to_string(),
        index: "vigil-rule-stats".to_string(),
        params: vec![ToolParam::required("rule_id")],
        filter_template: json!({ "rule_id": "?rule_id" }),
        columns: vec!["fp_rate".to_string()],
        size: 1,
    })?;
    catalog.register_query(QueryToolDefinition {
        name: "asset_criticality".to_string(),
        index: "vigil-assets".to_string(),
        params: vec![ToolParam::required("asset_id")],
        filter_template: json!({ "asset_id": "?asset_id" }),
        columns: vec!["criticality".to_string()],
        size: 1,
    })?;
    Ok(catalog)
}

fn investigator_catalog() -> Result<ToolCatalog, ToolError> {
    let mut catalog = ToolCatalog::new();
    for (name, size) in [("attack_chain_tracer_1h", 20), ("attack_chain_tracer_6h", 50), ("attack_chain_tracer_24h", 100)] {
        catalog.register_query(QueryToolDefinition {
            name: name.to_string(),
            index: "vigil-security-events".to_string(),
            params: vec![ToolParam::required("asset_id")],
            filter_template: json!({ "asset_id": "?asset_id" }),
            columns: vec!["technique_id".to_string(), "description".to_string()],
            size,
        })?;
    }
    catalog.register_query(QueryToolDefinition {
        name: "blast_radius_sweep".to_string(),
        index: "vigil-assets".to_string(),
        params: vec![ToolParam::required("asset_id")],
        filter_template: json!({ "seed_asset": "?asset_id" }),
        columns: vec!["asset".to_string(), "confidence".to_string()],
        size: 10,
    })?;
    catalog.register_query(QueryToolDefinition {
        name: "mitre_lookup".to_string(),
        index: "vigil-mitre-techniques".to_string(),
        params: vec![ToolParam::required("asset_id")],
        filter_template: json!({ "asset_id": "?asset_id" }),
        columns: vec!["technique_id".to_string()],
        size: 1,
    })?;
    catalog.register_query(QueryToolDefinition {
        name: "incident_similarity_search".to_string(),
        index: "vigil-incidents".to_string(),
        params: vec![ToolParam::required("asset_id")],
        filter_template: json!({ "asset_id": "?asset_id" }),
        columns: vec!["incident_id".to_string()],
        size: 10,
    })?;
    catalog.register_search(SearchToolDefinition {
        name: "threat_intel_match".to_string(),
        index: "vigil-threat-intel".to_string(),
        kind: SearchKind::Keyword,
        text_field: Some("indicator".to_string()),
        vector_field: None,
        result_fields: vec!["indicator".to_string(), "indicator_type".to_string(), "source".to_string()],
        min_score: None,
    })?;
    catalog.register_query(QueryToolDefinition {
        name: "change_correlation".to_string(),
        index: "vigil-deployments".to_string(),
        params: vec![ToolParam::required("asset_id")],
        filter_template: json!({ "asset_id": "?asset_id" }),
        columns: vec!["commit".to_string(), "author".to_string(), "time_gap_seconds".to_string()],
        size: 1,
    })?;
    Ok(catalog)
}

fn threat_hunter_catalog() -> Result<ToolCatalog, ToolError> {
    let mut catalog = ToolCatalog::new();
    catalog.register_query(QueryToolDefinition {
        name: "ioc_sweep_7d".to_string(),
        index: "vigil-threat-intel".to_string(),
        params: vec![ToolParam::required("asset_id")],
        filter_template: json!({ "asset_id": "?asset_id" }),
        columns: vec!["indicator".to_string()],
        size: 50,
    })?;
    catalog.register_query(QueryToolDefinition {
        name: "behavioral_anomaly".to_string(),
        index: "vigil-baselines".to_string(),
        params: vec![ToolParam::required("asset_id")],
        filter_template: json!({ "asset_id": "?asset_id" }),
        columns: vec!["anomaly_score".to_string()],
        size: 1,
    })?;
    Ok(catalog)
}

fn commander_catalog() -> Result<ToolCatalog, ToolError> {
    let mut catalog = ToolCatalog::new();
    catalog.register_query(QueryToolDefinition {
        name: "runbook_match".to_string(),
        index: "vigil-runbooks".to_string(),
        params: vec![ToolParam::required("incident_id")],
        filter_template: json!({ "incident_id": "?incident_id" }),
        columns: vec!["runbook_id".to_string()],
        size: 5,
    })?;
    catalog.register_query(QueryToolDefinition {
        name: "asset_criticality".to_string(),
        index: "vigil-assets".to_string(),
        params: vec![ToolParam::required("asset_id")],
        filter_template: json!({ "asset_id": "?asset_id" }),
        columns: vec!["criticality".to_string()],
        size: 1,
    })?;
    catalog.register_query(QueryToolDefinition {
        name: "current_metrics".to_string(),
        index: "vigil-metrics-services".to_string(),
        params: vec![ToolParam::required("service_name")],
        filter_template: json!({ "service_name": "?service_name" }),
        columns: vec!["avg_latency_ms".to_string()],
        size: 1,
    })?;
    Ok(catalog)
}

fn verifier_catalog() -> Result<ToolCatalog, ToolError> {
    let mut catalog = ToolCatalog::new();
    catalog.register_query(QueryToolDefinition {
        name: "service_health_metrics".to_string(),
        index: "vigil-metrics-services".to_string(),
        params: vec![ToolParam::required("service_name")],
        filter_template: json!({ "service_name": "?service_name" }),
        columns: vec!["error_rate".to_string(), "avg_latency".to_string(), "throughput".to_string()],
        size: 1,
    })?;
    Ok(catalog)
}

/// Builds the handler registry every A2A call is routed through, wiring each
/// of the six agent handlers with its tool catalog and the shared store,
/// clock, and integration suite (§4.6, §4.7).
///
/// # Errors
///
/// Returns [`ToolError::InvalidDefinition`] if one of this module's own
/// hand-written tool definitions is malformed — a configuration bug the
/// caller should treat as fatal at process startup, per §7's "crash the
/// worker at startup if the referenced tool is unknown" policy.
pub fn build_registry(
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    suite: Arc<IntegrationSuite>,
    config: &VigilConfigFile,
) -> Result<HandlerRegistry, ToolError> {
    let thresholds = ScoringThresholds {
        investigate_threshold: config.scoring.investigate_threshold,
        suppress_threshold: config.scoring.suppress_threshold,
    };
    let retry = RetryConfig { base_delay_ms: config.harness.retry_base_ms, max_attempts: config.harness.max_retries };
    let stabilization_wait = Duration::from_secs(config.verifier.stabilization_wait_seconds);

    let triage = TriageHandler::new(triage_catalog()?, Arc::clone(&store), Arc::clone(&clock), thresholds);
    let investigator = InvestigatorHandler::new(investigator_catalog()?, Arc::clone(&store), Arc::clone(&clock));
    let threat_hunter = ThreatHunterHandler::new(threat_hunter_catalog()?, Arc::clone(&store), Arc::clone(&clock));
    let commander = CommanderHandler::new(commander_catalog()?, Arc::clone(&store), Arc::clone(&clock));
    let executor = ExecutorHandler::new(suite, Arc::clone(&store), Arc::clone(&clock), retry);
    let verifier =
        VerifierHandler::new(verifier_catalog()?, store, clock, stabilization_wait, config.verifier.pass_threshold);

    Ok(HandlerRegistry::builder()
        .handler(agent_id::TRIAGE, triage, timeout_ms::TRIAGE)
        .handler(agent_id::INVESTIGATOR, investigator, timeout_ms::INVESTIGATOR)
        .handler(agent_id::THREAT_HUNTER, threat_hunter, timeout_ms::THREAT_HUNTER)
        .handler(agent_id::COMMANDER, commander, timeout_ms::COMMANDER)
        .handler(agent_id::EXECUTOR, executor, timeout_ms::EXECUTOR)
        .handler(agent_id::VERIFIER, verifier, timeout_ms::VERIFIER)
        .build())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use vigil_config::VigilConfigFile;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::SystemClock;
    use vigil_providers::IntegrationSuite;

    use super::*;

    #[test]
    fn registry_resolves_every_agent_id() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let config = vigil_config::VigilConfig {
            file: VigilConfigFile::default(),
            credentials: vigil_config::IntegrationCredentials::from_env(),
        };
        let suite = Arc::new(IntegrationSuite::from_config(&config).expect("suite must build in mock mode"));

        let registry = build_registry(store, clock, suite, &config.file).expect("registry must build");

        for id in [
            agent_id::TRIAGE,
            agent_id::INVESTIGATOR,
            agent_id::THREAT_HUNTER,
            agent_id::COMMANDER,
            agent_id::EXECUTOR,
            agent_id::VERIFIER,
        ] {
            assert!(registry.resolve(&id.into()).is_some(), "missing handler for {id}");
        }
    }
}
