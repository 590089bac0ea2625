// vigil-agents/src/verifier.rs
// ============================================================================
// Module: Verifier Handler
// Description: Deterministic `verify_resolution` agent handler (§4.6
//              Verifier).
// Purpose: Wait for the remediated services to stabilize, then check every
//          success criterion against current health metrics.
// ============================================================================

//! ## Overview
//! The verifier never touches the incident document: it is handed
//! [`vigil_contract::payloads::VerifyResolutionRequest`], checks each
//! criterion, and returns a [`vigil_core::model::VerificationResult`] for the
//! coordinator to append to `verification_results` under its own
//! compare-and-swap retry loop (the same reason [`crate::investigator`],
//! [`crate::threat_hunter`], and [`crate::commander`] never write to the
//! incident either — only [`crate::triage`] owns a document outright, the
//! alert it scores).
//!
//! The stabilization wait (default 10s, §13 Decision 1) is a fixed delay, not
//! adaptive to observed recovery speed: [`VerifierHandler::new`] takes it as
//! a parameter so a caller can shorten it, but the handler itself never
//! changes it based on what it measures.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use vigil_broker::tools::ToolCatalog;
use vigil_broker::tools::ToolExecutor;
use vigil_broker::AgentError;
use vigil_broker::AgentHandler;
use vigil_contract::payloads::VerifyResolutionRequest;
use vigil_contract::task::Task;
use vigil_core::model::CriterionActual;
use vigil_core::model::SuccessCriterion;
use vigil_core::model::VerificationResult;
use vigil_core::model::DEFAULT_PASS_THRESHOLD;
use vigil_core::store::DocumentStore;
use vigil_core::time::Clock;

/// Query tool returning a service's current `error_rate` / `avg_latency` /
/// `throughput` columns, keyed by `service_name` (§4.6 Verifier).
pub const TOOL_SERVICE_HEALTH: &str = "service_health_metrics";

/// Default stabilization wait before checking success criteria (§13
/// Decision 1).
pub const DEFAULT_STABILIZATION_WAIT: Duration = Duration::from_secs(10);

/// The `verify_resolution` / verifier agent handler (§4.6 Verifier).
pub struct VerifierHandler {
    catalog: ToolCatalog,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    stabilization_wait: Duration,
    pass_threshold: f64,
}

impl VerifierHandler {
    /// Builds a verifier handler over `catalog`'s service-health tool.
    #[must_use]
    pub fn new(catalog: ToolCatalog, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, stabilization_wait: Duration, pass_threshold: f64) -> Self {
        Self { catalog, store, clock, stabilization_wait, pass_threshold }
    }

    /// Builds a handler using the documented defaults: a 10s stabilization
    /// wait and [`DEFAULT_PASS_THRESHOLD`].
    #[must_use]
    pub fn with_defaults(catalog: ToolCatalog, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(catalog, store, clock, DEFAULT_STABILIZATION_WAIT, DEFAULT_PASS_THRESHOLD)
    }

    fn verify(&self, request: &VerifyResolutionRequest) -> VerificationResult {
        thread::sleep(self.stabilization_wait);

        let executor = ToolExecutor::new(&self.catalog, self.store.as_ref(), self.clock.as_ref());
        let criteria: Vec<CriterionActual> = request
            .success_criteria
            .iter()
            .map(|criterion| check_criterion(&executor, criterion))
            .collect();

        let failing: Vec<&str> = criteria.iter().filter(|c| !c.passed).map(|c| c.metric.as_str()).collect();
        let total = criteria.len();
        let failing_count = failing.len();
        let failing_summary = failing.join(", ");

        VerificationResult::from_criteria(request.iteration, criteria, self.clock.now(), self.pass_threshold, || {
            format!("{failing_count} of {total} criteria failed: {failing_summary}")
        })
    }
}

fn check_criterion(executor: &ToolExecutor<'_>, criterion: &SuccessCriterion) -> CriterionActual {
    let mut params = BTreeMap::new();
    params.insert("service_name".to_string(), Value::from(criterion.service_name.as_str()));

    let actual = executor
        .run_query(TOOL_SERVICE_HEALTH, &params)
        .ok()
        .and_then(|result| {
            let index = result.columns.iter().position(|c| c == &criterion.metric)?;
            result.values.first()?.get(index)?.as_f64()
        })
        .unwrap_or_else(|| fail_safe_default(criterion));

    let passed = criterion.operator.evaluate(actual, criterion.threshold);
    CriterionActual { metric: criterion.metric.clone(), actual, passed }
}

/// A measurement Vigil could not retrieve is never assumed to have passed:
/// for an upper-bound criterion this reports an impossibly high value, for a
/// lower-bound criterion an impossibly low one, so the criterion fails
/// rather than silently succeeding on absent data.
fn fail_safe_default(criterion: &SuccessCriterion) -> f64 {
    use vigil_core::model::ComparisonOperator;
    match criterion.operator {
        ComparisonOperator::Lt | ComparisonOperator::Lte => f64::INFINITY,
        ComparisonOperator::Gt | ComparisonOperator::Gte | ComparisonOperator::Eq => f64::NEG_INFINITY,
    }
}

impl AgentHandler for VerifierHandler {
    fn task(&self) -> Task {
        Task::VerifyResolution
    }

    fn invoke(&self, request: Value) -> Result<Value, AgentError> {
        let request: VerifyResolutionRequest = serde_json::from_value(request)
            .map_err(|err| AgentError::Rejected(format!("malformed verify_resolution request: {err}")))?;

        let result = self.verify(&request);
        serde_json::to_value(result).map_err(|err| AgentError::Rejected(format!("failed to serialize verification result: {err}")))
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
    use vigil_core::model::ComparisonOperator;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::FixedClock;

    use super::*;

    fn catalog() -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        catalog
            .register_query(QueryToolDefinition {
                name: TOOL_SERVICE_HEALTH.to_string(),
                index: "vigil-metrics-services".to_string(),
                params: vec![ToolParam::required("service_name")],
                filter_template: json!({ "service_name": "?service_name" }),
                columns: vec!["error_rate".to_string(), "avg_latency".to_string(), "throughput".to_string()],
                size: 1,
            })
            .expect("valid definition");
        catalog
    }

    fn criteria() -> Vec<SuccessCriterion> {
        vec![
            SuccessCriterion { metric: "error_rate".to_string(), operator: ComparisonOperator::Lte, threshold: 1.0, service_name: "srv-payment-01".to_string() },
            SuccessCriterion { metric: "avg_latency".to_string(), operator: ComparisonOperator::Lte, threshold: 200.0, service_name: "srv-payment-01".to_string() },
            SuccessCriterion { metric: "throughput".to_string(), operator: ComparisonOperator::Gte, threshold: 80.0, service_name: "srv-payment-01".to_string() },
        ]
    }

    fn handler(store: InMemoryDocumentStore) -> VerifierHandler {
        VerifierHandler::new(catalog(), Arc::new(store), Arc::new(FixedClock::new(chrono::Utc::now())), Duration::ZERO, DEFAULT_PASS_THRESHOLD)
    }

    #[test]
    fn all_criteria_within_bounds_pass_and_carry_no_failure_analysis() {
        let store = InMemoryDocumentStore::new();
        store
            .index("vigil-metrics-services", None, json!({"service_name": "srv-payment-01", "error_rate": 0.2, "avg_latency": 110.0, "throughput": 95.0}))
            .unwrap();

        let request = VerifyResolutionRequest { incident_id: IncidentId::new("INC-2026-00007"), iteration: 1, success_criteria: criteria() };
        let response = handler(store).invoke(serde_json::to_value(request).unwrap()).expect("verification must succeed");
        let result: VerificationResult = serde_json::from_value(response).unwrap();

        assert!(result.passed);
        assert!((result.health_score - 1.0).abs() < f64::EPSILON);
        assert!(result.failure_analysis.is_none());
    }

    #[test]
    fn a_breached_criterion_fails_and_carries_failure_analysis() {
        let store = InMemoryDocumentStore::new();
        store
            .index("vigil-metrics-services", None, json!({"service_name": "srv-payment-01", "error_rate": 5.0, "avg_latency": 110.0, "throughput": 95.0}))
            .unwrap();

        let request = VerifyResolutionRequest { incident_id: IncidentId::new("INC-2026-00008"), iteration: 1, success_criteria: criteria() };
        let response = handler(store).invoke(serde_json::to_value(request).unwrap()).expect("verification must respond even on failure");
        let result: VerificationResult = serde_json::from_value(response).unwrap();

        assert!(!result.passed);
        assert!(result.failure_analysis.as_ref().is_some_and(|analysis| analysis.contains("error_rate")));
    }

    #[test]
    fn missing_metrics_fail_safe_rather_than_silently_passing() {
        let store = InMemoryDocumentStore::new();
        let request = VerifyResolutionRequest { incident_id: IncidentId::new("INC-2026-00009"), iteration: 1, success_criteria: criteria() };
        let response = handler(store).invoke(serde_json::to_value(request).unwrap()).expect("verification must respond without data");
        let result: VerificationResult = serde_json::from_value(response).unwrap();

        assert!(!result.passed);
        assert_eq!(result.criteria.iter().filter(|c| !c.passed).count(), 3);
    }
}
