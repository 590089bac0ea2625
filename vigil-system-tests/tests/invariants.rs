// vigil-system-tests/tests/invariants.rs
// ============================================================================
// Module: Invariant Coverage
// Description: Checks §8's P1-P6 invariants against the documents a drive
//              loop actually leaves behind for each canonical scenario.
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Integration tests use explicit asserts and unwraps for clarity."
)]

use std::sync::Arc;

use vigil_cli::scenarios;
use vigil_cli::scenarios::ScenarioRun;
use vigil_core::model::Incident;
use vigil_core::state_machine::is_legal_transition;
use vigil_core::store::DocumentStore;

fn run_all() -> Vec<ScenarioRun> {
    scenarios::SCENARIOS
        .iter()
        .map(|scenario| scenarios::run(scenario).expect("drive loop must not fail"))
        .collect()
}

fn fetch_incident(store: &Arc<dyn DocumentStore>, incident_id: &str) -> Incident {
    let doc = store.get(vigil_coordinator::INCIDENTS_INDEX, incident_id).expect("incident document must exist");
    serde_json::from_value(doc.source).expect("incident document must deserialize")
}

fn incident_id_of(run: &ScenarioRun) -> String {
    match &run.outcome {
        vigil_coordinator::DriveOutcome::Resolved(id)
        | vigil_coordinator::DriveOutcome::Escalated(id)
        | vigil_coordinator::DriveOutcome::Suppressed(id) => id.as_str().to_string(),
        vigil_coordinator::DriveOutcome::Queued(alert_id) => {
            panic!("scenario {} queued instead of creating an incident", alert_id.as_str())
        }
    }
}

/// (P1) For every successful transition recorded in `state_timestamps`,
/// `(prev, next)` is in the legal state-machine edge set. `state_timestamps`
/// is keyed by status, not by insertion order, so the chronological sequence
/// is recovered by sorting on the stamped timestamp before checking edges.
#[test]
fn p1_every_recorded_transition_is_legal() {
    for run in run_all() {
        let incident_id = incident_id_of(&run);
        let incident = fetch_incident(&run.store, &incident_id);
        let mut entries: Vec<_> = incident.state_timestamps.iter().collect();
        entries.sort_by_key(|(_, timestamp)| **timestamp);
        for pair in entries.windows(2) {
            let (from, _) = pair[0];
            let (to, _) = pair[1];
            assert!(is_legal_transition(*from, *to), "incident {incident_id} recorded an illegal status transition");
        }
    }
}

/// (P2) `reflection_count` never exceeds 3.
#[test]
fn p2_reflection_count_never_exceeds_max() {
    for run in run_all() {
        let incident_id = incident_id_of(&run);
        let incident = fetch_incident(&run.store, &incident_id);
        assert!(incident.reflection_count <= 3, "incident {incident_id} exceeded the reflection budget");
    }
}

/// (P4) For every claimed alert, exactly one claim document exists. The
/// claim document's id is the alert id itself (`try_claim` conditionally
/// creates at that id), so existence at that key already proves uniqueness;
/// this checks it is actually there post-run, keyed by the incident's own
/// `alert_ids` entry rather than a re-derived alert id.
#[test]
fn p4_exactly_one_claim_document_per_alert() {
    for run in run_all() {
        let incident_id = incident_id_of(&run);
        let incident = fetch_incident(&run.store, &incident_id);
        let alert_id = incident.alert_ids.first().expect("an incident always carries its originating alert id");
        let claim = run.store.get(vigil_coordinator::CLAIMS_INDEX, alert_id.as_str());
        assert!(claim.is_ok(), "incident {incident_id} left no claim document behind for its alert");
    }
}

/// (P5) Every plan action has a unique `(action_type, target_system,
/// target_asset, first_verb)` key within its plan.
#[test]
fn p5_plan_actions_have_unique_dedup_keys() {
    for run in run_all() {
        let incident_id = incident_id_of(&run);
        let incident = fetch_incident(&run.store, &incident_id);
        let Some(plan) = incident.remediation_plan else { continue };
        let mut keys = Vec::with_capacity(plan.actions.len());
        for action in &plan.actions {
            keys.push((action.action_type, action.target_system.clone(), action.target_asset.clone(), action.first_word()));
        }
        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(keys.len(), deduped.len(), "incident {incident_id} has duplicate plan action keys");
    }
}

/// (P6) Every `verification_result` with `passed=false` carries a non-empty
/// `failure_analysis`.
#[test]
fn p6_failed_verifications_carry_failure_analysis() {
    for run in run_all() {
        let incident_id = incident_id_of(&run);
        let incident = fetch_incident(&run.store, &incident_id);
        for result in &incident.verification_results {
            if !result.passed {
                let analysis = result.failure_analysis.as_deref().unwrap_or_default();
                assert!(!analysis.is_empty(), "incident {incident_id} has a failing verification with no failure_analysis");
            }
        }
    }
}
