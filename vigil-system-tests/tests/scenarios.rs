// vigil-system-tests/tests/scenarios.rs
// ============================================================================
// Module: Scenario Coverage
// Description: Drives every canonical demo scenario end to end and checks
//              its outcome against §8's seed-scenario expectations.
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Integration tests use explicit asserts and unwraps for clarity."
)]

use vigil_cli::scenarios;
use vigil_coordinator::DriveOutcome;
use vigil_core::identifiers::IncidentId;

/// Unwraps a `DriveOutcome` that carries an `IncidentId`, asserting it is one
/// of the given variants without ever Debug-formatting the outcome itself.
fn expect_incident_id(outcome: &DriveOutcome, what: &str) -> IncidentId {
    match outcome {
        DriveOutcome::Resolved(incident_id) | DriveOutcome::Escalated(incident_id) | DriveOutcome::Suppressed(incident_id) => {
            incident_id.clone()
        }
        DriveOutcome::Queued(_) => panic!("expected a terminal incident outcome for {what}, got Queued"),
    }
}

#[test]
fn geo_anomaly_tier1_resolves_with_no_reflection() {
    let scenario = scenarios::find("geo-anomaly-tier1").expect("scenario is registered");
    let run = scenarios::run(scenario).expect("drive loop must not fail");
    assert!(matches!(run.outcome, DriveOutcome::Resolved(_)));
    let incident_id = expect_incident_id(&run.outcome, "geo-anomaly-tier1");

    let incident = fetch_incident(&run.store, incident_id.as_str());
    assert_eq!(incident.reflection_count, 0);
    let plan = incident.remediation_plan.expect("a resolved incident has a plan");
    assert_eq!(plan.actions.len(), 5);
    let mut prev_rank = 0;
    for action in &plan.actions {
        let rank = action.action_type.order_rank();
        assert!(rank >= prev_rank, "actions must be ordered monotonically by action_type");
        prev_rank = rank;
    }
}

#[test]
fn bad_deployment_resolves_via_a_container_orchestrator_rollback() {
    let scenario = scenarios::find("bad-deployment").expect("scenario is registered");
    let run = scenarios::run(scenario).expect("drive loop must not fail");
    assert!(matches!(run.outcome, DriveOutcome::Resolved(_)));
}

#[test]
fn reflection_loop_recovers_on_the_second_verification_attempt() {
    let scenario = scenarios::find("reflection-loop").expect("scenario is registered");
    let run = scenarios::run(scenario).expect("drive loop must not fail");
    assert!(matches!(run.outcome, DriveOutcome::Resolved(_)));
    let incident_id = expect_incident_id(&run.outcome, "reflection-loop");
    let incident = fetch_incident(&run.store, incident_id.as_str());
    assert_eq!(incident.reflection_count, 1);
    assert_eq!(incident.verification_results.len(), 2);
    assert!(!incident.verification_results[0].passed);
    assert!(incident.verification_results[1].passed);
}

#[test]
fn suppressed_low_signal_creates_no_working_incident() {
    let scenario = scenarios::find("suppressed-low-signal").expect("scenario is registered");
    let run = scenarios::run(scenario).expect("drive loop must not fail");
    assert!(matches!(run.outcome, DriveOutcome::Suppressed(_)));
    let incident_id = expect_incident_id(&run.outcome, "suppressed-low-signal");
    let incident = fetch_incident(&run.store, incident_id.as_str());
    assert!(incident.remediation_plan.is_none());
    assert!(incident.verification_results.is_empty());
}

#[test]
fn approval_rejected_escalates_before_any_action_completes() {
    let scenario = scenarios::find("approval-rejected").expect("scenario is registered");
    let run = scenarios::run(scenario).expect("drive loop must not fail");
    assert!(matches!(run.outcome, DriveOutcome::Escalated(_)));
    let incident_id = expect_incident_id(&run.outcome, "approval-rejected");
    let incident = fetch_incident(&run.store, incident_id.as_str());
    assert!(incident.verification_results.is_empty(), "a rejected approval must never reach execution or verification");
}

#[test]
fn reflection_budget_exhausted_escalates_at_exactly_three() {
    let scenario = scenarios::find("reflection-budget-exhausted").expect("scenario is registered");
    let run = scenarios::run(scenario).expect("drive loop must not fail");
    assert!(matches!(run.outcome, DriveOutcome::Escalated(_)));
    let incident_id = expect_incident_id(&run.outcome, "reflection-budget-exhausted");
    let incident = fetch_incident(&run.store, incident_id.as_str());
    assert_eq!(incident.reflection_count, 3);
    assert!(incident.verification_results.iter().all(|result| !result.passed));
}

fn fetch_incident(store: &std::sync::Arc<dyn vigil_core::store::DocumentStore>, incident_id: &str) -> vigil_core::model::Incident {
    let doc = store.get(vigil_coordinator::INCIDENTS_INDEX, incident_id).expect("incident document must exist");
    serde_json::from_value(doc.source).expect("incident document must deserialize")
}
