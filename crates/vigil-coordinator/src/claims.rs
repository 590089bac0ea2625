// vigil-coordinator/src/claims.rs
// ============================================================================
// Module: Alert Watcher
// Description: Claims-based single-consumer ingestion loop over the alerts
//              index (§4.8 intro, §5's "exactly-once alert handling", C11).
// Purpose: Let any number of coordinator instances poll the same alerts
//          index without two of them ever driving the same alert.
// ============================================================================

use vigil_contract::payloads::AlertTrigger;
use vigil_core::identifiers::AlertId;
use vigil_core::model::alert::Alert;
use vigil_core::store::DocumentStore;
use vigil_core::store::SearchQuery;
use vigil_core::store::StoreError;
use vigil_core::time::Clock;

/// Index the alert watcher reads unclaimed alerts from. Mirrors
/// `vigil-agents`'s private `triage::ALERTS_INDEX` constant — the alert a
/// coordinator claims here is the same document triage later reads and
/// writes enrichment back onto.
pub const ALERTS_INDEX: &str = "vigil-alerts-security";

/// Index claim documents live in (§5).
pub const CLAIMS_INDEX: &str = "vigil-alert-claims";

/// Alerts fetched per poll cycle (§5's "bounded batch size").
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// One unclaimed alert this watcher read from the store, not yet claimed.
#[derive(Debug, Clone)]
pub struct PendingAlert {
    /// The alert document as stored.
    pub alert: Alert,
}

/// Reads up to `batch_size` unprocessed alerts from [`ALERTS_INDEX`].
///
/// # Errors
///
/// Returns [`StoreError`] if the underlying search fails.
pub fn poll_unclaimed_alerts(
    store: &dyn DocumentStore,
    batch_size: usize,
) -> Result<Vec<PendingAlert>, StoreError> {
    let query = SearchQuery { filter: serde_json::json!({ "processed": false }), sort: Vec::new(), size: batch_size };
    let results = store.search(ALERTS_INDEX, &query)?;
    let alerts = results
        .hits
        .into_iter()
        .filter_map(|hit| serde_json::from_value::<Alert>(hit.source).ok())
        .map(|alert| PendingAlert { alert })
        .collect();
    Ok(alerts)
}

/// Attempts to claim `alert_id` for this coordinator instance by conditionally
/// creating a claim document (§5: "a conditional create. Losers observe a
/// conflict and skip").
///
/// Returns `Ok(Some(trigger))` when this call won the claim, `Ok(None)` when
/// another instance already claimed it, and `Err` for any other store failure.
///
/// # Errors
///
/// Returns [`StoreError`] for failures other than [`StoreError::AlreadyExists`].
pub fn try_claim(
    store: &dyn DocumentStore,
    clock: &dyn Clock,
    alert_id: &AlertId,
) -> Result<Option<AlertTrigger>, StoreError> {
    let claim_doc = serde_json::json!({
        "alert_id": alert_id.as_str(),
        "claimed_at": clock.now(),
    });
    match store.create(CLAIMS_INDEX, alert_id.as_str(), claim_doc) {
        Ok(_) => Ok(Some(AlertTrigger { alert_id: alert_id.clone() })),
        Err(StoreError::AlreadyExists { .. }) => Ok(None),
        Err(other) => Err(other),
    }
}

/// Polls [`ALERTS_INDEX`] for unprocessed alerts and claims each one in turn,
/// returning only the triggers this call actually won (§C11).
///
/// # Errors
///
/// Returns [`StoreError`] if the initial poll search fails. A claim race lost
/// on an individual alert is not an error; that alert is simply omitted.
pub fn claim_next_batch(
    store: &dyn DocumentStore,
    clock: &dyn Clock,
    batch_size: usize,
) -> Result<Vec<AlertTrigger>, StoreError> {
    let pending = poll_unclaimed_alerts(store, batch_size)?;
    let mut claimed = Vec::with_capacity(pending.len());
    for candidate in pending {
        if let Some(trigger) = try_claim(store, clock, &candidate.alert.alert_id)? {
            claimed.push(trigger);
        }
    }
    Ok(claimed)
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::FixedClock;

    use super::*;

    fn seed_alert(store: &InMemoryDocumentStore, alert_id: &str) {
        store
            .index(
                ALERTS_INDEX,
                Some(alert_id),
                serde_json::json!({
                    "alert_id": alert_id,
                    "rule_id": "geo-anomaly-1",
                    "severity_label": "high",
                    "source": "203.0.113.42",
                    "destination": null,
                    "asset": "srv-payment-01",
                    "enrichment": {},
                    "created_at": chrono::Utc::now(),
                    "processed": false,
                }),
            )
            .expect("seed alert");
    }

    #[test]
    fn second_claim_attempt_loses_the_race() {
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let alert_id = AlertId::from("alrt-1");

        let first = try_claim(&store, &clock, &alert_id).expect("claim must not error");
        let second = try_claim(&store, &clock, &alert_id).expect("claim must not error");

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn batch_claim_skips_nothing_on_first_pass() {
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        seed_alert(&store, "alrt-1");
        seed_alert(&store, "alrt-2");

        let claimed = claim_next_batch(&store, &clock, DEFAULT_BATCH_SIZE).expect("batch claim must succeed");

        assert_eq!(claimed.len(), 2);
    }
}
