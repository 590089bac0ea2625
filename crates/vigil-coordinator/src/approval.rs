// vigil-coordinator/src/approval.rs
// ============================================================================
// Module: Approval Gate
// Description: Posts an approval request and polls for a decision with a
//              deadline (§4.9, C9).
// Purpose: Give the drive loop a single blocking call that resolves to
//          approved, rejected, timed out, or failed-closed.
// ============================================================================

use std::thread;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde_json::json;
use vigil_config::ApprovalGateConfig;
use vigil_core::identifiers::ActionId;
use vigil_core::identifiers::IncidentId;
use vigil_core::model::ApprovalResponse;
use vigil_core::model::approval::NormalizedApproval;
use vigil_core::store::DocumentStore;
use vigil_core::store::SearchQuery;
use vigil_core::store::SortOrder;
use vigil_core::time::Clock;
use vigil_core::time::Timestamp;
use vigil_providers::ChatAdapter;
use vigil_providers::IntegrationHarness;

/// Index approval decisions are read from (§4.9, §6).
const APPROVAL_RESPONSES_INDEX: &str = "vigil-approval-responses";

/// Terminal disposition of one approval-gate run (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    /// A reviewer approved the action.
    Approved,
    /// A reviewer rejected the action.
    Rejected,
    /// No decision arrived before the deadline.
    Timeout,
    /// Polling failed too many times in a row; fails closed.
    Error,
}

/// Outcome of an approval-gate run (§4.9).
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalOutcome {
    /// Terminal disposition.
    pub status: ApprovalStatus,
    /// The user who decided, when a decision was recorded.
    pub decided_by: Option<String>,
    /// When the decision was recorded.
    pub decided_at: Option<Timestamp>,
}

impl ApprovalOutcome {
    const fn decided(status: ApprovalStatus, decided_by: String, decided_at: Timestamp) -> Self {
        Self { status, decided_by: Some(decided_by), decided_at: Some(decided_at) }
    }

    const fn undecided(status: ApprovalStatus) -> Self {
        Self { status, decided_by: None, decided_at: None }
    }
}

/// Posts an approval request for `action_id` and polls [`APPROVAL_RESPONSES_INDEX`]
/// until a decision arrives or `config`'s deadline elapses (§4.9).
///
/// The notification itself is best-effort: a failed post does not abort the
/// gate, since a reviewer may still act on a side channel.
#[allow(
    clippy::too_many_arguments,
    reason = "mirrors the distinct collaborators §4.9 names: chat, store, clock, and the gate's own tunables"
)]
pub fn run_approval_gate(
    store: &dyn DocumentStore,
    clock: &dyn Clock,
    chat: &ChatAdapter,
    harness: &IntegrationHarness<'_>,
    incident_id: &IncidentId,
    action_id: &ActionId,
    message: &str,
    config: &ApprovalGateConfig,
) -> ApprovalOutcome {
    let _ = chat.post_approval_request(harness, action_id.as_str(), message);

    let timeout_minutes = i64::try_from(config.timeout_minutes).unwrap_or(i64::MAX);
    let deadline = clock.now() + ChronoDuration::minutes(timeout_minutes);
    let mut consecutive_errors: u32 = 0;

    loop {
        if clock.now() >= deadline {
            return ApprovalOutcome::undecided(ApprovalStatus::Timeout);
        }

        let query = SearchQuery {
            filter: json!({ "incident_id": incident_id.as_str(), "action_id": action_id.as_str() }),
            sort: vec![("timestamp".to_string(), SortOrder::Desc)],
            size: 1,
        };
        match store.search(APPROVAL_RESPONSES_INDEX, &query) {
            Ok(results) => {
                consecutive_errors = 0;
                if let Some(decision) = results
                    .hits
                    .first()
                    .and_then(|hit| serde_json::from_value::<ApprovalResponse>(hit.source.clone()).ok())
                {
                    match decision.value.normalize() {
                        NormalizedApproval::Approve => {
                            return ApprovalOutcome::decided(ApprovalStatus::Approved, decision.user, decision.timestamp);
                        }
                        NormalizedApproval::Reject => {
                            return ApprovalOutcome::decided(ApprovalStatus::Rejected, decision.user, decision.timestamp);
                        }
                        NormalizedApproval::KeepPolling => {}
                    }
                }
            }
            Err(_) => {
                consecutive_errors += 1;
                if consecutive_errors >= config.max_consecutive_poll_errors {
                    return ApprovalOutcome::undecided(ApprovalStatus::Error);
                }
            }
        }

        thread::sleep(Duration::from_secs(config.poll_interval_seconds));
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use vigil_config::CredentialState;
    use vigil_core::model::approval::ApprovalValue;
    use vigil_core::store::InMemoryDocumentStore;
    use vigil_core::time::FixedClock;
    use vigil_core::time::SteppingClock;
    use vigil_providers::BreakerConfig;
    use vigil_providers::CircuitBreakerRegistry;
    use vigil_providers::RetryConfig;

    use super::*;

    fn gate_config() -> ApprovalGateConfig {
        ApprovalGateConfig { poll_interval_seconds: 0, timeout_minutes: 1, max_consecutive_poll_errors: 3 }
    }

    #[test]
    fn approved_decision_short_circuits_the_poll_loop() {
        let store = InMemoryDocumentStore::new();
        let clock = FixedClock::new(chrono::Utc::now());
        let chat = ChatAdapter::new(CredentialState::Mock, 1_000).expect("mock adapter builds");
        let breaker = CircuitBreakerRegistry::new(BreakerConfig::default());
        let harness = IntegrationHarness::new(RetryConfig::default(), &breaker, &clock);

        store
            .index(
                APPROVAL_RESPONSES_INDEX,
                Some("resp-1"),
                serde_json::json!({
                    "incident_id": "INC-2026-00001",
                    "action_id": "act-1",
                    "value": "approve",
                    "user": "oncall.lee",
                    "timestamp": clock.now(),
                }),
            )
            .expect("seed approval response");

        let outcome = run_approval_gate(
            &store,
            &clock,
            &chat,
            &harness,
            &IncidentId::new("INC-2026-00001"),
            &ActionId::new("act-1"),
            "isolate srv-payment-01",
            &gate_config(),
        );

        assert_eq!(outcome.status, ApprovalStatus::Approved);
        assert_eq!(outcome.decided_by.as_deref(), Some("oncall.lee"));
    }

    #[test]
    fn no_decision_times_out() {
        let store = InMemoryDocumentStore::new();
        let clock = SteppingClock::new(chrono::Utc::now(), chrono::Duration::seconds(10));
        let chat = ChatAdapter::new(CredentialState::Mock, 1_000).expect("mock adapter builds");
        let breaker = CircuitBreakerRegistry::new(BreakerConfig::default());
        let harness = IntegrationHarness::new(RetryConfig::default(), &breaker, &clock);

        let outcome = run_approval_gate(
            &store,
            &clock,
            &chat,
            &harness,
            &IncidentId::new("INC-2026-00001"),
            &ActionId::new("act-1"),
            "isolate srv-payment-01",
            &gate_config(),
        );

        assert_eq!(outcome.status, ApprovalStatus::Timeout);
    }

    #[test]
    fn info_value_keeps_polling_past_a_more_info_response() {
        let store = InMemoryDocumentStore::new();
        let clock = SteppingClock::new(chrono::Utc::now(), chrono::Duration::seconds(10));
        let chat = ChatAdapter::new(CredentialState::Mock, 1_000).expect("mock adapter builds");
        let breaker = CircuitBreakerRegistry::new(BreakerConfig::default());
        let harness = IntegrationHarness::new(RetryConfig::default(), &breaker, &clock);

        store
            .index(
                APPROVAL_RESPONSES_INDEX,
                Some("resp-1"),
                serde_json::json!({
                    "incident_id": "INC-2026-00001",
                    "action_id": "act-1",
                    "value": "info",
                    "user": "oncall.lee",
                    "timestamp": clock.now(),
                }),
            )
            .expect("seed approval response");

        let outcome = run_approval_gate(
            &store,
            &clock,
            &chat,
            &harness,
            &IncidentId::new("INC-2026-00001"),
            &ActionId::new("act-1"),
            "isolate srv-payment-01",
            &gate_config(),
        );

        assert_eq!(outcome.status, ApprovalStatus::Timeout);
        let _ = ApprovalValue::Info;
    }
}
