// vigil-cli/src/scenarios.rs
// ============================================================================
// Module: Demo Scenarios
// Description: Seeds a fresh in-memory store with the six canonical alert
//              scenarios and drives each one through the full pipeline.
// Purpose: Give `run-scenario`/`demo:all` deterministic, reproducible fixture
//          data without a live document-store backend.
// ============================================================================

//! ## Overview
//! Two pieces of the pipeline key their lookups off identifiers the caller
//! cannot know before the run starts: the commander's runbook match is keyed
//! by the freshly minted incident id, and the approval gate's decision poll
//! is keyed by that same incident id plus a freshly minted action id. Since
//! exactly one incident is ever in flight per scenario run, [`ScenarioStore`]
//! wraps an [`InMemoryDocumentStore`] and special-cases `search` against
//! those two indices (and, where a scenario needs metrics that change
//! between verification attempts, `vigil-metrics-services`) to hand back
//! canned results regardless of the filter's actual values. Every other
//! index is seeded up front through the ordinary store API and searched for
//! real, since its keys (`alert_id`, `rule_id`, `asset`) are chosen by this
//! module and known in advance.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;
use serde_json::Value;
use vigil_config::ApprovalGateConfig;
use vigil_config::IntegrationCredentials;
use vigil_config::ReflectionConfig;
use vigil_config::ScoringConfig;
use vigil_config::VerifierConfig;
use vigil_config::VigilConfig;
use vigil_config::VigilConfigFile;
use vigil_core::identifiers::AlertId;
use vigil_core::store::BulkOperation;
use vigil_core::store::BulkResult;
use vigil_core::store::DocumentStore;
use vigil_core::store::InMemoryDocumentStore;
use vigil_core::store::SearchHit;
use vigil_core::store::SearchQuery;
use vigil_core::store::SearchResults;
use vigil_core::store::StoreError;
use vigil_core::store::StoredDocument;
use vigil_core::time::FixedClock;
use vigil_coordinator::ALERTS_INDEX;
use vigil_coordinator::Drive;
use vigil_coordinator::DriveOutcome;
use vigil_coordinator::build_registry;
use vigil_coordinator::claims::try_claim;
use vigil_providers::IntegrationSuite;

const RUNBOOKS_INDEX: &str = "vigil-runbooks";
const APPROVAL_RESPONSES_INDEX: &str = "vigil-approval-responses";
const METRICS_INDEX: &str = "vigil-metrics-services";

/// A pre-configured approval response this scenario's operator would give.
#[derive(Debug, Clone, Copy)]
pub enum ApprovalDecision {
    /// The reviewer approves the pending action.
    Approve,
    /// The reviewer rejects the pending action.
    Reject,
}

/// How `vigil-metrics-services` should answer for the run's duration.
#[derive(Debug, Clone)]
enum MetricsProgram {
    /// Every call sees the same healthy numbers.
    Healthy,
    /// Every call sees failing throughput; used to exhaust reflections.
    AlwaysFailing,
    /// The first `flip_after` calls see failing throughput; every call after
    /// that sees healthy numbers (§ reflection-loop scenario).
    FlipAfter(u64),
}

/// Wraps an [`InMemoryDocumentStore`], answering `search` against the three
/// indices a scenario cannot pre-seed by identity, and delegating everything
/// else straight through.
pub struct ScenarioStore {
    inner: InMemoryDocumentStore,
    runbook_id: Option<String>,
    approval: Option<ApprovalDecision>,
    metrics: MetricsProgram,
    metrics_calls: AtomicU64,
}

impl ScenarioStore {
    fn new(runbook_id: Option<&str>, approval: Option<ApprovalDecision>, metrics: MetricsProgram) -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            runbook_id: runbook_id.map(ToString::to_string),
            approval,
            metrics,
            metrics_calls: AtomicU64::new(0),
        }
    }

    fn search_runbooks(&self) -> SearchResults {
        match &self.runbook_id {
            Some(runbook_id) => {
                let hit = SearchHit {
                    id: runbook_id.clone(),
                    seq_no: 0,
                    primary_term: 1,
                    source: json!({ "runbook_id": runbook_id }),
                };
                SearchResults { total: 1, hits: vec![hit] }
            }
            None => SearchResults::default(),
        }
    }

    fn search_approval(&self) -> SearchResults {
        match self.approval {
            Some(decision) => {
                let value = match decision {
                    ApprovalDecision::Approve => "approve",
                    ApprovalDecision::Reject => "reject",
                };
                let source = json!({
                    "incident_id": "current",
                    "action_id": "current",
                    "value": value,
                    "user": "demo-operator",
                    "timestamp": chrono::Utc::now(),
                });
                let hit = SearchHit { id: "resp-demo".to_string(), seq_no: 0, primary_term: 1, source };
                SearchResults { total: 1, hits: vec![hit] }
            }
            None => SearchResults::default(),
        }
    }

    fn search_metrics(&self) -> SearchResults {
        let call = self.metrics_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let throughput = match &self.metrics {
            MetricsProgram::Healthy => 120.0,
            MetricsProgram::AlwaysFailing => 10.0,
            MetricsProgram::FlipAfter(threshold) if call <= *threshold => 50.0,
            MetricsProgram::FlipAfter(_) => 120.0,
        };
        let source = json!({
            "avg_latency_ms": 40.0,
            "error_rate": 0.01,
            "avg_latency": 80.0,
            "throughput": throughput,
        });
        let hit = SearchHit { id: format!("metrics-{call}"), seq_no: 0, primary_term: 1, source };
        SearchResults { total: 1, hits: vec![hit] }
    }
}

impl DocumentStore for ScenarioStore {
    fn get(&self, index: &str, id: &str) -> Result<StoredDocument, StoreError> {
        self.inner.get(index, id)
    }

    fn index(&self, index: &str, id: Option<&str>, doc: Value) -> Result<StoredDocument, StoreError> {
        self.inner.index(index, id, doc)
    }

    fn create(&self, index: &str, id: &str, doc: Value) -> Result<StoredDocument, StoreError> {
        self.inner.create(index, id, doc)
    }

    fn update(&self, index: &str, id: &str, doc: Value, if_seq_no: u64, if_primary_term: u64) -> Result<StoredDocument, StoreError> {
        self.inner.update(index, id, doc, if_seq_no, if_primary_term)
    }

    fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResults, StoreError> {
        match index {
            RUNBOOKS_INDEX => Ok(self.search_runbooks()),
            APPROVAL_RESPONSES_INDEX => Ok(self.search_approval()),
            METRICS_INDEX => Ok(self.search_metrics()),
            _ => self.inner.search(index, query),
        }
    }

    fn delete_by_query(&self, index: &str, filter: &Value) -> Result<u64, StoreError> {
        self.inner.delete_by_query(index, filter)
    }

    fn bulk(&self, operations: Vec<BulkOperation>) -> Result<BulkResult, StoreError> {
        self.inner.bulk(operations)
    }

    fn count(&self, index: &str, filter: &Value) -> Result<u64, StoreError> {
        self.inner.count(index, filter)
    }
}

/// One runbook step, before it is folded into a [`vigil_core::model::Runbook`]
/// JSON document.
struct StepSeed {
    description: &'static str,
    target_system: &'static str,
    target_asset: &'static str,
    rollback_target_system: Option<&'static str>,
}

fn step_json(step: &StepSeed) -> Value {
    let rollback = step.rollback_target_system.map_or_else(Vec::new, |target_system| {
        vec![json!({ "description": "revert to the previous known-good state", "target_system": target_system })]
    });
    json!({
        "description": step.description,
        "target_system": step.target_system,
        "target_asset": step.target_asset,
        "approval_required": false,
        "rollback": rollback,
    })
}

/// One fully self-contained demo scenario: the alert it seeds and the
/// expectation a human reader can check the drive outcome against.
pub struct Scenario {
    /// Stable identifier passed to `run-scenario`.
    pub id: &'static str,
    /// One-line summary shown in `demo:all` output and `--help`.
    pub summary: &'static str,
    /// Plain-English statement of the outcome this scenario should reach,
    /// shown alongside the actual [`DriveOutcome`] so a reader can compare.
    pub expectation: &'static str,
    alert_id: &'static str,
    rule_id: &'static str,
    severity_label: &'static str,
    asset: &'static str,
    risk_signal: f64,
    fp_rate: f64,
    criticality: &'static str,
    deployment: Option<(&'static str, &'static str, f64)>,
    runbook_id: Option<&'static str>,
    steps: &'static [StepSeed],
    approval: Option<ApprovalDecision>,
    metrics: fn() -> MetricsProgram,
}

/// Every demo scenario, in the order `demo:all` runs them.
pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        id: "geo-anomaly-tier1",
        summary: "Tier-1 asset, high-confidence geo-anomaly login, auto-approved containment",
        expectation: "resolved, reflection_count = 0, plan required approval and was approved",
        alert_id: "alert-geo-anomaly-1",
        rule_id: "geo-anomaly-login",
        severity_label: "high",
        asset: "srv-payment-01",
        risk_signal: 72.5,
        fp_rate: 0.02,
        criticality: "tier-1",
        deployment: None,
        runbook_id: Some("rb-geo-anomaly"),
        steps: &[
            StepSeed {
                description: "isolate srv-payment-01 via firewall to contain the intrusion",
                target_system: "firewall",
                target_asset: "srv-payment-01",
                rollback_target_system: None,
            },
            StepSeed {
                description: "restore the payment service from its last known-good configuration",
                target_system: "container-orchestrator",
                target_asset: "srv-payment-01",
                rollback_target_system: None,
            },
            StepSeed {
                description: "rotate compromised credentials for the payment service account",
                target_system: "identity",
                target_asset: "srv-payment-01",
                rollback_target_system: None,
            },
            StepSeed {
                description: "notify stakeholders in the incident channel",
                target_system: "chat",
                target_asset: "srv-payment-01",
                rollback_target_system: None,
            },
            StepSeed {
                description: "document the root cause in the post-incident record",
                target_system: "chat",
                target_asset: "srv-payment-01",
                rollback_target_system: None,
            },
        ],
        approval: Some(ApprovalDecision::Approve),
        metrics: || MetricsProgram::Healthy,
    },
    Scenario {
        id: "bad-deployment",
        summary: "Sentinel-classified operational anomaly correlated with a recent deployment",
        expectation: "resolved via the container-orchestrator rollback, approval required for the rollback step",
        alert_id: "alert-deploy-regression-1",
        rule_id: "sentinel-deploy-regression",
        severity_label: "high",
        asset: "svc-checkout",
        risk_signal: 50.0,
        fp_rate: 0.1,
        criticality: "tier-2",
        deployment: Some(("a3f8c21", "dana.ops", 30.0)),
        runbook_id: Some("rb-deploy-rollback"),
        steps: &[StepSeed {
            description: "rollback deployment commit a3f8c21 on the checkout service",
            target_system: "container-orchestrator",
            target_asset: "svc-checkout",
            rollback_target_system: Some("container-orchestrator"),
        }],
        approval: Some(ApprovalDecision::Approve),
        metrics: || MetricsProgram::Healthy,
    },
    Scenario {
        id: "reflection-loop",
        summary: "Remediation under-shoots once, the verifier fails, the second attempt recovers",
        expectation: "resolved, reflection_count = 1",
        alert_id: "alert-orders-latency-1",
        rule_id: "orders-latency-regression",
        severity_label: "medium",
        asset: "svc-orders",
        risk_signal: 75.0,
        fp_rate: 0.05,
        criticality: "tier-2",
        deployment: None,
        runbook_id: Some("rb-orders-remediation"),
        steps: &[StepSeed {
            description: "restart the orders service worker pool",
            target_system: "container-orchestrator",
            target_asset: "svc-orders",
            rollback_target_system: None,
        }],
        approval: None,
        metrics: || MetricsProgram::FlipAfter(4),
    },
    Scenario {
        id: "suppressed-low-signal",
        summary: "Low severity, low risk signal, high historical false-positive rate",
        expectation: "suppressed at triage, no incident work performed",
        alert_id: "alert-login-minor-1",
        rule_id: "login-anomaly-minor",
        severity_label: "low",
        asset: "srv-edge-03",
        risk_signal: 1.5,
        fp_rate: 0.85,
        criticality: "tier-3",
        deployment: None,
        runbook_id: None,
        steps: &[],
        approval: None,
        metrics: || MetricsProgram::Healthy,
    },
    Scenario {
        id: "approval-rejected",
        summary: "Critical tier-1 containment action rejected by the reviewer",
        expectation: "escalated before execution, no completed action-audit records",
        alert_id: "alert-geo-anomaly-2",
        rule_id: "geo-anomaly-login",
        severity_label: "critical",
        asset: "srv-payment-02",
        risk_signal: 80.0,
        fp_rate: 0.02,
        criticality: "tier-1",
        deployment: None,
        runbook_id: Some("rb-geo-anomaly-reject"),
        steps: &[StepSeed {
            description: "isolate srv-payment-02 via firewall to contain the intrusion",
            target_system: "firewall",
            target_asset: "srv-payment-02",
            rollback_target_system: None,
        }],
        approval: Some(ApprovalDecision::Reject),
        metrics: || MetricsProgram::Healthy,
    },
    Scenario {
        id: "reflection-budget-exhausted",
        summary: "Remediation never recovers service health across every reflection attempt",
        expectation: "escalated, reflection_count = 3",
        alert_id: "alert-db-latency-1",
        rule_id: "db-latency-spike",
        severity_label: "high",
        asset: "db-primary-01",
        risk_signal: 65.0,
        fp_rate: 0.05,
        criticality: "tier-2",
        deployment: None,
        runbook_id: Some("rb-db-restart"),
        steps: &[StepSeed {
            description: "restart the db-primary-01 connection pool",
            target_system: "container-orchestrator",
            target_asset: "db-primary-01",
            rollback_target_system: None,
        }],
        approval: None,
        metrics: || MetricsProgram::AlwaysFailing,
    },
];

/// Looks up a scenario by its CLI-facing id.
#[must_use]
pub fn find(id: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.id == id)
}

/// Outcome of driving one scenario end to end.
pub struct ScenarioRun {
    /// The scenario that was driven.
    pub scenario: &'static Scenario,
    /// The drive loop's terminal disposition.
    pub outcome: DriveOutcome,
    /// The store the scenario was driven against, left open for callers that
    /// need to inspect the documents the drive loop wrote (incidents,
    /// claims, action-audit records).
    pub store: Arc<dyn DocumentStore>,
}

/// Seeds a fresh store for `scenario`, drives it through the pipeline, and
/// returns the terminal outcome.
///
/// # Errors
///
/// Returns a boxed error if seeding, claiming, registry construction, or the
/// drive loop itself fails. A scenario that reaches `Escalated` is not an
/// error; only a fatal pipeline failure is.
pub fn run(scenario: &'static Scenario) -> Result<ScenarioRun, Box<dyn std::error::Error>> {
    let store = ScenarioStore::new(scenario.runbook_id, scenario.approval, (scenario.metrics)());
    seed(&store, scenario);
    let store: Arc<dyn DocumentStore> = Arc::new(store);
    let clock: Arc<dyn vigil_core::time::Clock> = Arc::new(FixedClock::new(chrono::Utc::now()));

    let config = demo_config();
    let credentials = IntegrationCredentials::from_env();
    let suite = Arc::new(IntegrationSuite::from_config(&VigilConfig { file: config.clone(), credentials })?);
    let registry = build_registry(Arc::clone(&store), Arc::clone(&clock), Arc::clone(&suite), &config)?;

    let trigger = try_claim(store.as_ref(), clock.as_ref(), &AlertId::new(scenario.alert_id))?
        .ok_or("scenario alert was already claimed, which should never happen on a fresh store")?;

    let drive = Drive::new(store.as_ref(), clock.as_ref(), &registry, &suite, &config);
    let outcome = drive.run(trigger)?;
    Ok(ScenarioRun { scenario, outcome, store })
}

fn demo_config() -> VigilConfigFile {
    VigilConfigFile {
        approval_gate: ApprovalGateConfig { poll_interval_seconds: 0, timeout_minutes: 1, max_consecutive_poll_errors: 3 },
        verifier: VerifierConfig { stabilization_wait_seconds: 0, pass_threshold: 0.8 },
        reflection: ReflectionConfig { max_reflection_count: 3 },
        scoring: ScoringConfig::default(),
        ..VigilConfigFile::default()
    }
}

fn seed(store: &ScenarioStore, scenario: &Scenario) {
    let now = chrono::Utc::now();

    if let Some((commit, author, time_gap_seconds)) = scenario.deployment {
        store
            .index(
                "vigil-deployments",
                Some("deploy-seed"),
                json!({ "asset_id": scenario.alert_id, "commit": commit, "author": author, "time_gap_seconds": time_gap_seconds }),
            )
            .ok();
    }

    store
        .index(
            ALERTS_INDEX,
            Some(scenario.alert_id),
            json!({
                "alert_id": scenario.alert_id,
                "rule_id": scenario.rule_id,
                "severity_label": scenario.severity_label,
                "source": "203.0.113.42",
                "destination": null,
                "asset": scenario.asset,
                "enrichment": {},
                "created_at": now,
                "processed": false,
            }),
        )
        .ok();

    store
        .index(
            "vigil-alert-signals",
            Some("signal-seed"),
            json!({ "alert_id": scenario.alert_id, "risk_signal": scenario.risk_signal }),
        )
        .ok();
    store
        .index("vigil-rule-stats", Some("stats-seed"), json!({ "rule_id": scenario.rule_id, "fp_rate": scenario.fp_rate }))
        .ok();
    store
        .index(
            "vigil-assets",
            Some(format!("asset-{}", scenario.asset)),
            json!({ "asset_id": scenario.asset, "criticality": scenario.criticality }),
        )
        .ok();

    // Two security-events rows are enough to clear the investigator's
    // sparse-attack-chain threshold on the 1h tracer without widening.
    for (index, description) in [(1, "suspicious authentication from a new geography"), (2, "privilege escalation attempt following the login")] {
        store
            .index(
                "vigil-security-events",
                Some(format!("event-{}-{index}", scenario.alert_id)),
                json!({ "asset_id": scenario.alert_id, "technique_id": "T1078", "description": description }),
            )
            .ok();
    }

    if let Some(runbook_id) = scenario.runbook_id {
        let steps: Vec<Value> = scenario.steps.iter().map(step_json).collect();
        store.index(RUNBOOKS_INDEX, Some(runbook_id), json!({ "runbook_id": runbook_id, "steps": steps })).ok();
    }
}
